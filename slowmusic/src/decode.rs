//! Turning file bytes into something a rodio `Sink` can play.
//!
//! rodio's `Decoder` streams most formats straight from the bytes. Files it
//! rejects (some m4a/aac) are decoded up front with symphonia and replayed
//! from memory.

use crate::engine::EngineError;
use rodio::{Decoder, Source};
use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

pub type BoxedSource = Box<dyn Source<Item = f32> + Send>;

type ByteCursor = Cursor<Arc<[u8]>>;

/// A loaded file that can be turned into a fresh source any number of times.
pub struct AudioData {
    repr: Repr,
    duration_ms: Option<i64>,
}

enum Repr {
    Encoded(Arc<[u8]>),
    Pcm(Pcm),
}

#[derive(Clone)]
struct Pcm {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioData {
    /// `ext` is only a hint for symphonia format detection.
    pub fn load(bytes: Vec<u8>, ext: &str) -> Result<Self, EngineError> {
        let bytes: Arc<[u8]> = bytes.into();
        match rodio_decoder(bytes.clone()) {
            Ok(decoder) => Ok(Self {
                duration_ms: decoder.total_duration().map(millis),
                repr: Repr::Encoded(bytes),
            }),
            Err(e) => {
                log::debug!("{}, falling back to symphonia", e);
                let pcm = decode_with_symphonia(bytes, ext)?;
                let frames = pcm.samples.len() as f64 / pcm.channels as f64;
                Ok(Self {
                    duration_ms: Some((frames * 1000.0 / pcm.sample_rate as f64) as i64),
                    repr: Repr::Pcm(pcm),
                })
            }
        }
    }

    /// Length as reported by the decoder, if it knows.
    pub fn duration_ms(&self) -> Option<i64> {
        self.duration_ms
    }

    /// A new source positioned at the start.
    pub fn source(&self) -> Result<BoxedSource, EngineError> {
        match &self.repr {
            Repr::Encoded(bytes) => {
                let decoder = rodio_decoder(bytes.clone())?;
                Ok(Box::new(decoder.convert_samples::<f32>()))
            }
            Repr::Pcm(pcm) => Ok(Box::new(SamplesSource { pcm: pcm.clone(), pos: 0 })),
        }
    }
}

fn millis(d: Duration) -> i64 {
    d.as_millis() as i64
}

// Some rodio decoders panic on malformed input instead of returning an error.
fn rodio_decoder(bytes: Arc<[u8]>) -> Result<Decoder<ByteCursor>, EngineError> {
    match catch_unwind(AssertUnwindSafe(|| Decoder::new(Cursor::new(bytes)))) {
        Ok(Ok(decoder)) => Ok(decoder),
        Ok(Err(e)) => Err(EngineError::Decode(format!("rodio: {}", e))),
        Err(_) => Err(EngineError::Decode("rodio: decoder panicked".into())),
    }
}

/// A rodio Source over pre-decoded interleaved f32 samples
struct SamplesSource {
    pcm: Pcm,
    pos: usize,
}

impl Iterator for SamplesSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let s = self.pcm.samples.get(self.pos).copied()?;
        self.pos += 1;
        Some(s)
    }
}

impl Source for SamplesSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.pcm.samples.len() - self.pos)
    }

    fn channels(&self) -> u16 {
        self.pcm.channels
    }

    fn sample_rate(&self) -> u32 {
        self.pcm.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let frames = self.pcm.samples.len() as f64 / self.pcm.channels as f64;
        Some(Duration::from_secs_f64(frames / self.pcm.sample_rate as f64))
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), rodio::source::SeekError> {
        let frame = (pos.as_secs_f64() * self.pcm.sample_rate as f64) as usize;
        // Stay on a frame boundary so channels don't swap
        let sample = frame.saturating_mul(self.pcm.channels as usize);
        self.pos = sample.min(self.pcm.samples.len());
        Ok(())
    }
}

fn decode_with_symphonia(bytes: Arc<[u8]>, ext: &str) -> Result<Pcm, EngineError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if !ext.is_empty() {
        hint.with_extension(ext);
    }

    let found = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| EngineError::Decode(format!("format: {}", e)))?;

    let mut format = found.format;
    let track = format
        .default_track()
        .ok_or_else(|| EngineError::Decode("no audio track found".into()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| EngineError::Decode(format!("codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream surfaces as an IO error
            Err(symphonia::core::errors::Error::IoError(_)) => break,
            Err(e) => {
                log::warn!("symphonia stopped early: {}", e);
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let signal = *decoded.spec();
                sample_rate = signal.rate;
                channels = signal.channels.count() as u16;
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, signal);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                log::debug!("skipping bad packet: {}", e);
            }
            Err(e) => return Err(EngineError::Decode(format!("decode: {}", e))),
        }
    }

    if samples.is_empty() || channels == 0 {
        return Err(EngineError::Decode("no audio data decoded".into()));
    }

    Ok(Pcm { samples: samples.into(), sample_rate, channels })
}

/// 16-bit mono PCM WAV with `frames` frames of silence.
#[cfg(test)]
pub(crate) fn wav_bytes(sample_rate: u32, frames: u32) -> Vec<u8> {
    let data_len = frames * 2;
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(out.len() + data_len as usize, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_source(samples: Vec<f32>, sample_rate: u32, channels: u16) -> SamplesSource {
        SamplesSource {
            pcm: Pcm { samples: samples.into(), sample_rate, channels },
            pos: 0,
        }
    }

    #[test]
    fn test_wav_loads_and_replays() {
        let audio = AudioData::load(wav_bytes(8000, 800), "wav").unwrap();
        assert_eq!(audio.duration_ms(), Some(100));

        let first = audio.source().unwrap();
        assert_eq!(first.channels(), 1);
        assert_eq!(first.sample_rate(), 8000);
        assert_eq!(first.count(), 800);

        // A second source starts over from the beginning
        assert_eq!(audio.source().unwrap().count(), 800);
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let result = AudioData::load(b"definitely not audio".to_vec(), "mp3");
        assert!(matches!(result, Err(EngineError::Decode(_))));
    }

    #[test]
    fn test_samples_source_duration() {
        let src = pcm_source(vec![0.0; 88_200], 44_100, 2);
        assert_eq!(src.total_duration(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_samples_source_seek_clamps_and_aligns() {
        let mut src = pcm_source((0..8).map(|i| i as f32).collect(), 2, 2);

        src.try_seek(Duration::from_millis(1500)).unwrap();
        assert_eq!(src.next(), Some(6.0));

        src.try_seek(Duration::from_secs(60)).unwrap();
        assert_eq!(src.next(), None);

        src.try_seek(Duration::ZERO).unwrap();
        assert_eq!(src.next(), Some(0.0));
    }
}
