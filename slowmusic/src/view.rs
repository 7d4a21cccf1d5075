//! What the window shows. The controller writes it, the app paints it.

use crate::engine::PlaybackState;
use slowcore::widgets::TransportGlyph;

/// Bounded progress indicator, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub value: i64,
    pub minimum: i64,
    pub maximum: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    /// Glyph on the play/pause button.
    pub icon: TransportGlyph,
    pub progress: Progress,
    pub artist: String,
    pub title: String,
    /// Set once tags have loaded for the current track.
    pub title_emphasized: bool,
    /// Pending warning dialog text.
    pub warning: Option<String>,
}

impl Default for PlayerView {
    fn default() -> Self {
        Self {
            icon: TransportGlyph::Play,
            progress: Progress::default(),
            artist: String::new(),
            title: String::new(),
            title_emphasized: false,
            warning: None,
        }
    }
}

impl PlayerView {
    /// Paused shows the play glyph, Playing the pause glyph.
    /// Any other state leaves the icon alone.
    pub fn show_state(&mut self, state: PlaybackState) {
        match state {
            PlaybackState::Paused => self.icon = TransportGlyph::Play,
            PlaybackState::Playing => self.icon = TransportGlyph::Pause,
            PlaybackState::Stopped => {}
        }
    }

    pub fn clear_track(&mut self) {
        self.artist.clear();
        self.title.clear();
        self.title_emphasized = false;
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warning = Some(message.into());
    }

    pub fn dismiss_warning(&mut self) {
        self.warning = None;
    }
}

/// `m:ss`. Negative offsets read as zero.
pub fn format_clock(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}
