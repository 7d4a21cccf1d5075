//! Storage utilities for Slow Computer apps
//!
//! Config loading, well-known directories, and the state behind the
//! open-file dialog.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("File not found: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Read and parse a JSON document.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(StorageError::NotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Simple file browser state
#[derive(Debug, Clone)]
pub struct FileBrowser {
    pub current_dir: PathBuf,
    pub entries: Vec<FileEntry>,
    pub selected_index: Option<usize>,
    pub filter_extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
}

impl FileBrowser {
    pub fn new(start_dir: PathBuf) -> Self {
        let mut browser = Self {
            current_dir: start_dir,
            entries: Vec::new(),
            selected_index: None,
            filter_extensions: Vec::new(),
        };
        browser.refresh();
        browser
    }

    /// Only list files whose extension (case-insensitive) is one of `extensions`.
    pub fn with_filter<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().to_lowercase())
            .collect();
        self.refresh();
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.filter_extensions.is_empty() {
            return true;
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.filter_extensions.iter().any(|f| *f == ext)
    }

    pub fn refresh(&mut self) {
        self.entries.clear();
        self.selected_index = None;

        if let Some(parent) = self.current_dir.parent() {
            self.entries.push(FileEntry {
                name: "..".to_string(),
                path: parent.to_path_buf(),
                is_directory: true,
            });
        }

        let read_dir = match std::fs::read_dir(&self.current_dir) {
            Ok(rd) => rd,
            Err(e) => {
                log::warn!("cannot list {}: {}", self.current_dir.display(), e);
                return;
            }
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in read_dir.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let is_directory = path.is_dir();
            if !is_directory && !self.accepts(&path) {
                continue;
            }
            let entry = FileEntry { name, path, is_directory };
            if is_directory {
                dirs.push(entry);
            } else {
                files.push(entry);
            }
        }

        dirs.sort_by_key(|e| e.name.to_lowercase());
        files.sort_by_key(|e| e.name.to_lowercase());
        self.entries.extend(dirs);
        self.entries.extend(files);
    }

    pub fn navigate_to(&mut self, path: PathBuf) {
        if path.is_dir() {
            self.current_dir = path;
            self.refresh();
        }
    }

    pub fn selected_entry(&self) -> Option<&FileEntry> {
        self.selected_index.and_then(|i| self.entries.get(i))
    }
}

/// Get the config directory for Slow Computer apps
pub fn config_dir(app_name: &str) -> PathBuf {
    directories::ProjectDirs::from("co", "slowcomputer", app_name)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the documents directory
pub fn documents_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the music directory, falling back to documents
pub fn music_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.audio_dir().map(|p| p.to_path_buf()))
        .unwrap_or_else(documents_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_filter_keeps_matching_files_and_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "b.MP3");
        touch(tmp.path(), "a.wav");
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), ".hidden.mp3");
        fs::create_dir(tmp.path().join("albums")).unwrap();

        let browser = FileBrowser::new(tmp.path().to_path_buf()).with_filter(["mp3", "m4a", "wav"]);
        let names: Vec<&str> = browser.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["..", "albums", "a.wav", "b.MP3"]);
    }

    #[test]
    fn test_no_filter_lists_everything() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "notes.txt");
        let browser = FileBrowser::new(tmp.path().to_path_buf());
        assert!(browser.entries.iter().any(|e| e.name == "notes.txt"));
    }

    #[test]
    fn test_navigate_and_select() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("sub");
        fs::create_dir(&sub).unwrap();
        touch(&sub, "song.m4a");

        let mut browser = FileBrowser::new(tmp.path().to_path_buf()).with_filter(["m4a"]);
        browser.navigate_to(sub.clone());
        assert_eq!(browser.current_dir, sub);
        assert!(browser.selected_entry().is_none());

        browser.selected_index = Some(1);
        let entry = browser.selected_entry().unwrap();
        assert_eq!(entry.name, "song.m4a");
        assert!(!entry.is_directory);

        // Navigating to a file is ignored
        browser.navigate_to(sub.join("song.m4a"));
        assert_eq!(browser.current_dir, sub);
    }

    #[test]
    fn test_load_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("conf.json");

        assert!(matches!(load_json::<Vec<u32>>(&path), Err(StorageError::NotFound(_))));

        fs::write(&path, "[1, 2, 3]").unwrap();
        assert_eq!(load_json::<Vec<u32>>(&path).unwrap(), vec![1, 2, 3]);

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_json::<Vec<u32>>(&path), Err(StorageError::Json(_))));
    }
}
