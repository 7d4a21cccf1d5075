//! [`MediaEngine`] on top of rodio.
//!
//! Each player owns at most one `Sink`. Files load on a background thread;
//! a watcher thread reports position and end of media. Both exit once the
//! player is dropped or its event receiver goes away.

use crate::decode::AudioData;
use crate::engine::{
    EngineError, MediaEngine, MediaPlayer, MediaStatus, PlaybackState, PlayerEvent, TrackMetadata,
};
use crate::tags;
use parking_lot::Mutex;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WATCH_INTERVAL: Duration = Duration::from_millis(100);

/// Builds a fresh sink attached to wherever the audio goes.
type SinkFactory = Arc<dyn Fn() -> Result<Sink, EngineError> + Send + Sync>;

/// Opens the default output device on first use and keeps it open.
#[derive(Default)]
pub struct RodioEngine {
    output: Option<(OutputStream, OutputStreamHandle)>,
}

impl RodioEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn output_handle(&mut self) -> Result<OutputStreamHandle, EngineError> {
        if let Some((_, handle)) = &self.output {
            return Ok(handle.clone());
        }
        let (stream, handle) = OutputStream::try_default()?;
        log::info!("opened default audio output");
        self.output = Some((stream, handle.clone()));
        Ok(handle)
    }
}

impl MediaEngine for RodioEngine {
    type Player = RodioPlayer;

    fn create_player(&mut self, events: Sender<PlayerEvent>) -> Result<RodioPlayer, EngineError> {
        let handle = self.output_handle()?;
        let new_sink: SinkFactory = Arc::new(move || Ok(Sink::try_new(&handle)?));
        let player = RodioPlayer::with_output(new_sink, events);
        player.spawn_watcher();
        Ok(player)
    }
}

struct Shared {
    state: PlaybackState,
    status: Option<MediaStatus>,
    /// Bumped on every `set_source` so a slow loader can't install stale audio.
    generation: u64,
    audio: Option<Arc<AudioData>>,
    sink: Option<Sink>,
    duration_ms: i64,
    metadata: TrackMetadata,
    volume: f32,
    /// Where the next sink starts; the position while there is no sink.
    start_ms: i64,
    last_reported_ms: i64,
}

impl Shared {
    fn position(&self) -> i64 {
        match &self.sink {
            Some(sink) => clamp_position(sink.get_pos().as_millis() as i64, self.duration_ms),
            None => self.start_ms,
        }
    }

    /// Build a paused sink for the loaded audio if there isn't one yet.
    fn ensure_sink(&mut self, new_sink: &SinkFactory) -> Result<Option<&Sink>, EngineError> {
        if self.sink.is_none() {
            let Some(audio) = &self.audio else {
                return Ok(None);
            };
            let sink = new_sink()?;
            sink.pause();
            sink.set_volume(self.volume);
            sink.append(audio.source()?);
            if self.start_ms > 0 {
                if let Err(e) = sink.try_seek(Duration::from_millis(self.start_ms as u64)) {
                    log::warn!("cannot resume at {} ms: {}", self.start_ms, e);
                }
            }
            self.sink = Some(sink);
        }
        Ok(self.sink.as_ref())
    }

    /// Record a state change and report it if it is one.
    fn change_state(&mut self, state: PlaybackState, events: &Sender<PlayerEvent>) {
        if self.state != state {
            self.state = state;
            let _ = events.send(PlayerEvent::PlaybackStateChanged(state));
        }
    }
}

struct Inner {
    shared: Mutex<Shared>,
    closed: AtomicBool,
}

impl Inner {
    /// One watcher step: end of media or a position change.
    fn tick(&self) -> Vec<PlayerEvent> {
        let mut shared = self.shared.lock();
        let finished = shared.state == PlaybackState::Playing
            && shared.sink.as_ref().is_some_and(|sink| sink.empty());
        if finished {
            shared.sink = None;
            shared.start_ms = 0;
            shared.state = PlaybackState::Stopped;
            shared.status = Some(MediaStatus::EndOfMedia);
            log::debug!("end of media");
            return vec![
                PlayerEvent::PlaybackStateChanged(PlaybackState::Stopped),
                PlayerEvent::MediaStatusChanged(MediaStatus::EndOfMedia),
            ];
        }

        let position = shared.position();
        if position == shared.last_reported_ms {
            return Vec::new();
        }
        shared.last_reported_ms = position;
        vec![PlayerEvent::PositionChanged(position)]
    }
}

pub struct RodioPlayer {
    inner: Arc<Inner>,
    new_sink: SinkFactory,
    events: Sender<PlayerEvent>,
}

impl RodioPlayer {
    fn with_output(new_sink: SinkFactory, events: Sender<PlayerEvent>) -> Self {
        let inner = Arc::new(Inner {
            shared: Mutex::new(Shared {
                state: PlaybackState::Paused,
                status: None,
                generation: 0,
                audio: None,
                sink: None,
                duration_ms: 0,
                metadata: TrackMetadata::default(),
                volume: 1.0,
                start_ms: 0,
                last_reported_ms: 0,
            }),
            closed: AtomicBool::new(false),
        });
        Self { inner, new_sink, events }
    }

    /// Report position and end of media until the player goes away.
    fn spawn_watcher(&self) {
        let watcher = self.inner.clone();
        let tx = self.events.clone();
        thread::spawn(move || loop {
            thread::sleep(WATCH_INTERVAL);
            if watcher.closed.load(Ordering::Acquire) {
                return;
            }
            for event in watcher.tick() {
                if tx.send(event).is_err() {
                    return;
                }
            }
        });
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }

    /// Drop whatever was loaded and mark a new load. Returns its generation.
    fn begin_load(&self) -> u64 {
        let generation = {
            let mut shared = self.inner.shared.lock();
            if let Some(sink) = shared.sink.take() {
                sink.stop();
            }
            shared.generation += 1;
            shared.audio = None;
            shared.duration_ms = 0;
            shared.metadata = TrackMetadata::default();
            shared.start_ms = 0;
            shared.last_reported_ms = 0;
            shared.status = Some(MediaStatus::LoadingMedia);
            shared.generation
        };
        self.emit(PlayerEvent::MediaStatusChanged(MediaStatus::LoadingMedia));
        generation
    }
}

/// Read, decode and tag `path`, then install the result if it is still wanted.
fn load(inner: Arc<Inner>, new_sink: SinkFactory, events: Sender<PlayerEvent>, path: PathBuf, generation: u64) {
    let loaded = std::fs::read(&path)
        .map_err(|source| EngineError::Io { path: path.clone(), source })
        .and_then(|bytes| {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            AudioData::load(bytes, ext)
        });
    let info = tags::read_track_info(&path);

    let mut shared = inner.shared.lock();
    if shared.generation != generation || inner.closed.load(Ordering::Acquire) {
        log::debug!("dropping stale load of {}", path.display());
        return;
    }

    let audio = match loaded {
        Ok(audio) => audio,
        Err(e) => {
            log::warn!("cannot load {}: {}", path.display(), e);
            // A play() made while loading has nothing to play
            shared.change_state(PlaybackState::Paused, &events);
            shared.status = Some(MediaStatus::InvalidMedia);
            let _ = events.send(PlayerEvent::MediaStatusChanged(MediaStatus::InvalidMedia));
            let _ = events.send(PlayerEvent::Error(e));
            return;
        }
    };

    shared.duration_ms = info.duration_ms.or(audio.duration_ms()).unwrap_or(0);
    shared.metadata = info.metadata;
    shared.audio = Some(Arc::new(audio));
    shared.status = Some(MediaStatus::LoadedMedia);
    log::info!("loaded {} ({} ms)", path.display(), shared.duration_ms);

    // play() was requested while loading
    if shared.state == PlaybackState::Playing {
        match shared.ensure_sink(&new_sink) {
            Ok(Some(sink)) => sink.play(),
            Ok(None) => {}
            Err(e) => {
                log::error!("cannot start playback: {}", e);
                shared.change_state(PlaybackState::Paused, &events);
                let _ = events.send(PlayerEvent::Error(e));
            }
        }
    }
    let _ = events.send(PlayerEvent::MediaStatusChanged(MediaStatus::LoadedMedia));
}

impl MediaPlayer for RodioPlayer {
    fn set_source(&mut self, path: &Path) {
        let generation = self.begin_load();
        let inner = self.inner.clone();
        let new_sink = self.new_sink.clone();
        let events = self.events.clone();
        let path = path.to_path_buf();
        thread::spawn(move || load(inner, new_sink, events, path, generation));
    }

    fn set_volume(&mut self, percent: u8) {
        let mut shared = self.inner.shared.lock();
        shared.volume = f32::from(percent.min(100)) / 100.0;
        if let Some(sink) = &shared.sink {
            sink.set_volume(shared.volume);
        }
    }

    fn play(&mut self) {
        let mut shared = self.inner.shared.lock();
        if shared.state == PlaybackState::Playing {
            return;
        }
        match shared.status {
            Some(MediaStatus::LoadingMedia) => {}
            Some(MediaStatus::LoadedMedia) | Some(MediaStatus::EndOfMedia) => {
                match shared.ensure_sink(&self.new_sink) {
                    Ok(Some(sink)) => sink.play(),
                    Ok(None) => {}
                    Err(e) => {
                        log::error!("cannot start playback: {}", e);
                        self.emit(PlayerEvent::Error(e));
                        return;
                    }
                }
                if shared.status == Some(MediaStatus::EndOfMedia) {
                    shared.status = Some(MediaStatus::LoadedMedia);
                }
            }
            Some(MediaStatus::InvalidMedia) | None => {
                log::debug!("play requested with nothing loaded");
                return;
            }
        }
        shared.change_state(PlaybackState::Playing, &self.events);
    }

    fn pause(&mut self) {
        let mut shared = self.inner.shared.lock();
        if shared.state != PlaybackState::Playing {
            return;
        }
        if let Some(sink) = &shared.sink {
            sink.pause();
        }
        shared.change_state(PlaybackState::Paused, &self.events);
    }

    fn stop(&mut self) {
        let mut shared = self.inner.shared.lock();
        if shared.state == PlaybackState::Stopped {
            return;
        }
        if let Some(sink) = shared.sink.take() {
            sink.stop();
        }
        shared.start_ms = 0;
        shared.last_reported_ms = 0;
        shared.change_state(PlaybackState::Stopped, &self.events);
        self.emit(PlayerEvent::PositionChanged(0));
    }

    fn set_position(&mut self, position_ms: i64) {
        let mut guard = self.inner.shared.lock();
        let shared = &mut *guard;
        let target = clamp_position(position_ms, shared.duration_ms);
        match &shared.sink {
            Some(sink) => {
                if let Err(e) = sink.try_seek(Duration::from_millis(target as u64)) {
                    log::warn!("seek to {} ms failed: {}", target, e);
                }
            }
            None => {
                shared.start_ms = target;
            }
        }
        shared.last_reported_ms = target;
        self.emit(PlayerEvent::PositionChanged(target));
    }

    fn position(&self) -> i64 {
        self.inner.shared.lock().position()
    }

    fn duration(&self) -> i64 {
        self.inner.shared.lock().duration_ms
    }

    fn playback_state(&self) -> PlaybackState {
        self.inner.shared.lock().state
    }

    fn metadata(&self) -> TrackMetadata {
        self.inner.shared.lock().metadata.clone()
    }
}

impl Drop for RodioPlayer {
    fn drop(&mut self) {
        self.inner.closed.store(true, Ordering::Release);
        if let Some(sink) = self.inner.shared.lock().sink.take() {
            sink.stop();
        }
    }
}

/// Keep a position inside the track. An unknown duration (0) only bounds below.
fn clamp_position(position_ms: i64, duration_ms: i64) -> i64 {
    let position = position_ms.max(0);
    if duration_ms > 0 {
        position.min(duration_ms)
    } else {
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::wav_bytes;
    use rodio::queue::SourcesQueueOutput;
    use std::sync::mpsc::{self, Receiver};

    type Outputs = Arc<Mutex<Vec<SourcesQueueOutput<f32>>>>;

    /// A player whose sinks feed queues the test pulls by hand.
    fn idle_player() -> (RodioPlayer, Receiver<PlayerEvent>, Outputs) {
        let outputs: Outputs = Arc::default();
        let sinks = outputs.clone();
        let new_sink: SinkFactory = Arc::new(move || {
            let (sink, output) = Sink::new_idle();
            sinks.lock().push(output);
            Ok(sink)
        });
        let (tx, rx) = mpsc::channel();
        (RodioPlayer::with_output(new_sink, tx), rx, outputs)
    }

    /// 8 kHz mono silence, `ms` long.
    fn write_wav(dir: &Path, name: &str, ms: u32) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, wav_bytes(8000, ms * 8)).unwrap();
        path
    }

    /// Run the loader on this thread.
    fn load_sync(player: &RodioPlayer, path: &Path, generation: u64) {
        load(
            player.inner.clone(),
            player.new_sink.clone(),
            player.events.clone(),
            path.to_path_buf(),
            generation,
        );
    }

    fn names(rx: &Receiver<PlayerEvent>) -> Vec<&'static str> {
        rx.try_iter()
            .map(|event| match event {
                PlayerEvent::PositionChanged(_) => "position",
                PlayerEvent::PlaybackStateChanged(PlaybackState::Playing) => "playing",
                PlayerEvent::PlaybackStateChanged(PlaybackState::Paused) => "paused",
                PlayerEvent::PlaybackStateChanged(PlaybackState::Stopped) => "stopped",
                PlayerEvent::MediaStatusChanged(MediaStatus::LoadingMedia) => "loading",
                PlayerEvent::MediaStatusChanged(MediaStatus::LoadedMedia) => "loaded",
                PlayerEvent::MediaStatusChanged(MediaStatus::EndOfMedia) => "end",
                PlayerEvent::MediaStatusChanged(MediaStatus::InvalidMedia) => "invalid",
                PlayerEvent::Error(_) => "error",
            })
            .collect()
    }

    /// Pull `samples` from the newest sink, as the mixer would.
    fn pull(outputs: &Outputs, samples: usize) {
        let mut outputs = outputs.lock();
        let output = outputs.last_mut().unwrap();
        output.by_ref().take(samples).for_each(drop);
    }

    #[test]
    fn test_clamp_position() {
        assert_eq!(clamp_position(-5_000, 200_000), 0);
        assert_eq!(clamp_position(5_000, 200_000), 5_000);
        assert_eq!(clamp_position(203_000, 200_000), 200_000);
        assert_eq!(clamp_position(203_000, 0), 203_000);
        assert_eq!(clamp_position(-1, 0), 0);
    }

    #[test]
    fn test_load_reports_loaded_and_stays_paused() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "tone.wav", 100);
        let (player, rx, outputs) = idle_player();

        let generation = player.begin_load();
        load_sync(&player, &path, generation);

        assert_eq!(names(&rx), ["loading", "loaded"]);
        assert_eq!(player.duration(), 100);
        assert_eq!(player.playback_state(), PlaybackState::Paused);
        assert!(outputs.lock().is_empty());
    }

    #[test]
    fn test_play_while_loading_starts_once_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "tone.wav", 100);
        let (mut player, rx, outputs) = idle_player();

        let generation = player.begin_load();
        player.play();
        assert_eq!(player.playback_state(), PlaybackState::Playing);
        assert!(outputs.lock().is_empty());

        load_sync(&player, &path, generation);
        assert_eq!(names(&rx), ["loading", "playing", "loaded"]);
        assert_eq!(outputs.lock().len(), 1);
        let shared = player.inner.shared.lock();
        assert_eq!(shared.sink.as_ref().map(|sink| sink.is_paused()), Some(false));
    }

    #[test]
    fn test_failed_load_while_playing_settles_paused() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.m4a");
        std::fs::write(&path, b"this is not an m4a file").unwrap();
        let (mut player, rx, outputs) = idle_player();

        let generation = player.begin_load();
        player.play();
        load_sync(&player, &path, generation);

        assert_eq!(names(&rx), ["loading", "playing", "paused", "invalid", "error"]);
        assert_eq!(player.playback_state(), PlaybackState::Paused);

        // Nothing to play: a further play() changes nothing
        player.play();
        assert!(names(&rx).is_empty());
        assert_eq!(player.playback_state(), PlaybackState::Paused);
        assert!(outputs.lock().is_empty());
    }

    #[test]
    fn test_missing_file_is_invalid_media() {
        let tmp = tempfile::tempdir().unwrap();
        let (player, rx, _outputs) = idle_player();

        let generation = player.begin_load();
        load_sync(&player, &tmp.path().join("gone.mp3"), generation);

        let events: Vec<PlayerEvent> = rx.try_iter().collect();
        assert!(matches!(events.last(), Some(PlayerEvent::Error(EngineError::Io { .. }))));
        assert_eq!(player.inner.shared.lock().status, Some(MediaStatus::InvalidMedia));
    }

    #[test]
    fn test_stale_load_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let first = write_wav(tmp.path(), "first.wav", 100);
        let second = write_wav(tmp.path(), "second.wav", 200);
        let (player, rx, _outputs) = idle_player();

        let old_generation = player.begin_load();
        let generation = player.begin_load();
        load_sync(&player, &first, old_generation);

        assert_eq!(names(&rx), ["loading", "loading"]);
        assert_eq!(player.duration(), 0);
        assert_eq!(player.inner.shared.lock().status, Some(MediaStatus::LoadingMedia));

        load_sync(&player, &second, generation);
        assert_eq!(names(&rx), ["loaded"]);
        assert_eq!(player.duration(), 200);
    }

    #[test]
    fn test_set_position_clamps_and_stop_rewinds() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "tone.wav", 100);
        let (mut player, rx, _outputs) = idle_player();
        let generation = player.begin_load();
        load_sync(&player, &path, generation);
        names(&rx);

        player.set_position(60);
        assert_eq!(player.position(), 60);
        player.set_position(500);
        assert_eq!(player.position(), 100);
        player.set_position(-5);
        assert_eq!(player.position(), 0);

        player.set_position(40);
        names(&rx);
        player.stop();
        assert_eq!(names(&rx), ["stopped", "position"]);
        assert_eq!(player.position(), 0);
        assert_eq!(player.playback_state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_tick_reports_position_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "tone.wav", 100);
        let (mut player, rx, outputs) = idle_player();
        let generation = player.begin_load();
        load_sync(&player, &path, generation);
        player.play();
        names(&rx);

        pull(&outputs, 400);
        let events = player.inner.tick();
        assert!(matches!(events[..], [PlayerEvent::PositionChanged(ms)] if ms > 0 && ms <= 100));
        assert!(player.inner.tick().is_empty());
    }

    #[test]
    fn test_drained_sink_ends_media() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_wav(tmp.path(), "tone.wav", 100);
        let (mut player, rx, outputs) = idle_player();
        let generation = player.begin_load();
        load_sync(&player, &path, generation);
        player.play();
        names(&rx);

        pull(&outputs, 4000);
        let events = player.inner.tick();
        assert!(matches!(
            events[..],
            [
                PlayerEvent::PlaybackStateChanged(PlaybackState::Stopped),
                PlayerEvent::MediaStatusChanged(MediaStatus::EndOfMedia),
            ]
        ));
        assert_eq!(player.playback_state(), PlaybackState::Stopped);
        assert_eq!(player.position(), 0);
        assert!(player.inner.shared.lock().sink.is_none());
        assert!(player.inner.tick().is_empty());

        // Playing again starts a fresh sink from the top
        player.play();
        assert_eq!(names(&rx), ["playing"]);
        assert_eq!(outputs.lock().len(), 2);
    }
}
