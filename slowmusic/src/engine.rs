//! Playback engine seam.
//!
//! The controller talks to a [`MediaPlayer`] for requests and hears back
//! through a channel of [`PlayerEvent`]s. Requests never report their
//! outcome directly; the resulting state change arrives later as an event.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Engine-owned transport state. Discriminants follow the engine numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped = 0,
    Playing = 1,
    Paused = 2,
}

/// Load progress of the current source. Discriminants follow the engine numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
    LoadingMedia = 1,
    LoadedMedia = 2,
    EndOfMedia = 6,
    InvalidMedia = 7,
}

/// Tag fields shown by the player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub artist: Option<String>,
    pub title: Option<String>,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no audio output device: {0}")]
    NoOutputDevice(#[from] rodio::StreamError),
    #[error("audio error: {0}")]
    Sink(#[from] rodio::PlayError),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decode error: {0}")]
    Decode(String),
}

/// Notifications emitted by a player, delivered in emission order.
#[derive(Debug)]
pub enum PlayerEvent {
    PositionChanged(i64),
    PlaybackStateChanged(PlaybackState),
    MediaStatusChanged(MediaStatus),
    Error(EngineError),
}

/// One loaded source and its output. Positions and durations are milliseconds.
pub trait MediaPlayer {
    fn set_source(&mut self, path: &Path);
    /// Output volume in percent, 0-100.
    fn set_volume(&mut self, percent: u8);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    /// Out-of-range positions are clamped by the player.
    fn set_position(&mut self, position_ms: i64);
    fn position(&self) -> i64;
    /// Zero until the source has loaded.
    fn duration(&self) -> i64;
    fn playback_state(&self) -> PlaybackState;
    fn metadata(&self) -> TrackMetadata;
}

/// Factory for players. Each player reports on its own `events` channel.
pub trait MediaEngine {
    type Player: MediaPlayer;

    fn create_player(&mut self, events: Sender<PlayerEvent>) -> Result<Self::Player, EngineError>;
}
