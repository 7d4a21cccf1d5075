//! User settings, read from `settings.json` in the app config directory.

use serde::Deserialize;
use slowcore::storage::{config_dir, load_json, music_dir, StorageError};
use std::path::{Path, PathBuf};

const DEFAULT_VOLUME: u8 = 50;
const DEFAULT_SEEK_STEP_MS: i64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Output volume for every newly opened file, in percent.
    pub volume: u8,
    /// Distance covered by one seek backward/forward.
    pub seek_step_ms: i64,
    /// Where the open dialog starts.
    pub start_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            seek_step_ms: DEFAULT_SEEK_STEP_MS,
            start_dir: None,
        }
    }
}

/// `settings.json` as written by hand. Numbers are wide so that an
/// out-of-range value is corrected instead of failing the whole file.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct SettingsFile {
    volume: i64,
    seek_step_ms: i64,
    start_dir: Option<PathBuf>,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            volume: i64::from(DEFAULT_VOLUME),
            seek_step_ms: DEFAULT_SEEK_STEP_MS,
            start_dir: None,
        }
    }
}

impl From<SettingsFile> for Settings {
    fn from(file: SettingsFile) -> Self {
        let volume = file.volume.clamp(0, 100);
        if volume != file.volume {
            log::warn!("volume {} out of range, using {}", file.volume, volume);
        }
        let seek_step_ms = if file.seek_step_ms > 0 {
            file.seek_step_ms
        } else {
            log::warn!("seek step must be positive, using {} ms", DEFAULT_SEEK_STEP_MS);
            DEFAULT_SEEK_STEP_MS
        };
        Self {
            volume: volume as u8,
            seek_step_ms,
            start_dir: file.start_dir,
        }
    }
}

impl Settings {
    fn config_path() -> PathBuf {
        config_dir("slowmusic").join("settings.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match load_json::<SettingsFile>(path) {
            Ok(file) => {
                log::info!("loaded settings from {}", path.display());
                file.into()
            }
            Err(StorageError::NotFound(_)) => Self::default(),
            Err(e) => {
                log::warn!("ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn start_dir(&self) -> PathBuf {
        self.start_dir
            .clone()
            .filter(|dir| dir.is_dir())
            .unwrap_or_else(music_dir)
    }
}
