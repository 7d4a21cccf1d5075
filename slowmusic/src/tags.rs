//! Tag and duration lookup for a loaded file.
//!
//! lofty first; MP3 files with tags lofty rejects go through id3.

use crate::engine::TrackMetadata;
use id3::TagLike;
use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub metadata: TrackMetadata,
    pub duration_ms: Option<i64>,
}

/// Never fails: unreadable tags just leave the fields empty.
pub fn read_track_info(path: &Path) -> TrackInfo {
    match read_with_lofty(path) {
        Ok(info) => info,
        Err(e) => {
            log::debug!("lofty could not read {}: {}", path.display(), e);
            if is_mp3(path) {
                read_with_id3(path).unwrap_or_default()
            } else {
                TrackInfo::default()
            }
        }
    }
}

fn read_with_lofty(path: &Path) -> Result<TrackInfo, lofty::error::LoftyError> {
    let tagged = lofty::read_from_path(path)?;
    let tag = tagged.primary_tag().or(tagged.first_tag());
    let metadata = TrackMetadata {
        artist: tag.and_then(|t| non_empty(t.artist().as_deref())),
        title: tag.and_then(|t| non_empty(t.title().as_deref())),
    };
    let duration = tagged.properties().duration();
    Ok(TrackInfo {
        metadata,
        duration_ms: (!duration.is_zero()).then(|| duration.as_millis() as i64),
    })
}

fn read_with_id3(path: &Path) -> Option<TrackInfo> {
    let tag = id3::Tag::read_from_path(path)
        .map_err(|e| log::debug!("id3 could not read {}: {}", path.display(), e))
        .ok()?;
    Some(TrackInfo {
        metadata: TrackMetadata {
            artist: non_empty(tag.artist()),
            title: non_empty(tag.title()),
        },
        duration_ms: tag.duration().map(i64::from),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3"))
}

/// Tag title, or the file name without extension.
pub fn display_title(metadata: &TrackMetadata, path: &Path) -> String {
    metadata.title.clone().unwrap_or_else(|| {
        path.file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".into())
    })
}
