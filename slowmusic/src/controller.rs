//! Routes user intents to the active player and player events to the view.
//!
//! At most one [`Session`] is live. Requests are fire-and-forget; the view
//! only changes in response to the events a player sends back, which are
//! drained once per frame by [`PlaybackController::pump_events`].

use crate::engine::{
    EngineError, MediaEngine, MediaPlayer, MediaStatus, PlaybackState, PlayerEvent,
};
use crate::settings::Settings;
use crate::tags::display_title;
use crate::view::PlayerView;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("No file selected")]
    NoFileSelected,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A loaded file bound to its player. Dropping it drops the event
/// receiver, so nothing the old player sends can arrive afterwards.
struct Session<P> {
    source: PathBuf,
    player: P,
    events: Receiver<PlayerEvent>,
}

pub struct PlaybackController<E: MediaEngine> {
    engine: E,
    session: Option<Session<E::Player>>,
    view: PlayerView,
    volume: u8,
    seek_step_ms: i64,
}

impl<E: MediaEngine> PlaybackController<E> {
    pub fn new(engine: E, settings: &Settings) -> Self {
        Self {
            engine,
            session: None,
            view: PlayerView::default(),
            volume: settings.volume,
            seek_step_ms: settings.seek_step_ms,
        }
    }

    pub fn view(&self) -> &PlayerView {
        &self.view
    }

    pub fn dismiss_warning(&mut self) {
        self.view.dismiss_warning();
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn source(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.source.as_path())
    }

    pub fn is_playing(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.player.playback_state() == PlaybackState::Playing)
    }

    /// Result of the open-file prompt. `None` means the user picked nothing.
    pub fn file_selected(&mut self, selection: Option<PathBuf>) {
        let result = match selection {
            Some(path) => self.open_file(&path),
            None => Err(PlayerError::NoFileSelected),
        };
        if let Err(e) = result {
            log::warn!("open failed: {}", e);
            self.view.warn(e.to_string());
        }
    }

    /// Replace the current session with a fresh player for `path`.
    ///
    /// The old session is stopped and dropped before the engine is asked
    /// for a new player. If that fails no session is left.
    pub fn open_file(&mut self, path: &Path) -> Result<(), PlayerError> {
        if let Some(mut old) = self.session.take() {
            self.view.show_state(PlaybackState::Paused);
            old.player.stop();
            log::info!("closed {}", old.source.display());
        }

        let (tx, rx) = mpsc::channel();
        let mut player = self.engine.create_player(tx)?;
        player.set_volume(self.volume);
        player.set_source(path);
        self.session = Some(Session {
            source: path.to_path_buf(),
            player,
            events: rx,
        });

        self.view.progress.value = 0;
        self.view.progress.minimum = 0;
        self.view.progress.maximum = 0;
        self.view.clear_track();
        self.view.show_state(PlaybackState::Paused);
        log::info!("opened {}", path.display());
        Ok(())
    }

    pub fn toggle_play_pause(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.view.progress.maximum = session.player.duration();
        if session.player.playback_state() == PlaybackState::Playing {
            log::debug!("pause requested");
            session.player.pause();
        } else {
            log::debug!("play requested");
            session.player.play();
        }
    }

    /// Move by `delta_ms` from the current position. The player clamps.
    pub fn seek(&mut self, delta_ms: i64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let target = session.player.position() + delta_ms;
        log::debug!("seek {:+} ms to {} ms", delta_ms, target);
        session.player.set_position(target);
    }

    pub fn seek_backward(&mut self) {
        self.seek(-self.seek_step_ms);
    }

    pub fn seek_forward(&mut self) {
        self.seek(self.seek_step_ms);
    }

    /// Jump to an absolute position, e.g. a click on the progress bar.
    pub fn seek_to(&mut self, position_ms: i64) {
        if let Some(session) = self.session.as_mut() {
            session.player.set_position(position_ms);
        }
    }

    /// Handle everything the active player has sent since the last call,
    /// in order. Returns how many events were handled.
    pub fn pump_events(&mut self) -> usize {
        let Some(session) = &self.session else {
            return 0;
        };
        let events: Vec<PlayerEvent> = session.events.try_iter().collect();
        let handled = events.len();
        for event in events {
            match event {
                PlayerEvent::PositionChanged(ms) => self.on_position_changed(ms),
                PlayerEvent::PlaybackStateChanged(state) => self.on_playback_state_changed(state),
                PlayerEvent::MediaStatusChanged(status) => self.on_media_status_changed(status),
                PlayerEvent::Error(e) => self.on_engine_error(e),
            }
        }
        handled
    }

    pub fn on_position_changed(&mut self, position_ms: i64) {
        self.view.progress.value = position_ms;
    }

    pub fn on_playback_state_changed(&mut self, state: PlaybackState) {
        self.view.show_state(state);
    }

    pub fn on_media_status_changed(&mut self, status: MediaStatus) {
        match status {
            // Back to the start and stay there; no auto-replay
            MediaStatus::EndOfMedia => {
                self.view.progress.value = 0;
                if let Some(session) = self.session.as_mut() {
                    session.player.stop();
                }
                self.view.show_state(PlaybackState::Paused);
            }
            MediaStatus::LoadedMedia => self.show_metadata(),
            MediaStatus::InvalidMedia => {
                self.view.progress.value = 0;
                self.view.show_state(PlaybackState::Paused);
            }
            MediaStatus::LoadingMedia => {}
        }
    }

    pub fn on_engine_error(&mut self, error: EngineError) {
        log::error!("playback error: {}", error);
        self.view.warn(error.to_string());
    }

    fn show_metadata(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let metadata = session.player.metadata();
        if let Some(artist) = &metadata.artist {
            self.view.artist = artist.clone();
        }
        self.view.title = display_title(&metadata, &session.source);
        self.view.title_emphasized = true;
        self.view.progress.maximum = session.player.duration();
    }
}
