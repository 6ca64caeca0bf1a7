use std::path::{Path, PathBuf};
use std::time::Duration;

/// One track in the library. Built once from the tags and never mutated;
/// the path is its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    pub path: PathBuf,
    pub file_name: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: String, // display form, "m:ss"
}

/// Tag values as read from disk, already defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
}

pub const UNKNOWN: &str = "Unknown";
pub const ZERO_DURATION: &str = "0:00";

impl TrackTags {
    /// What a track shows when its tags can't be read.
    pub fn fallback(file_name: &str) -> Self {
        Self {
            title: file_name.to_string(),
            artist: UNKNOWN.to_string(),
            album: UNKNOWN.to_string(),
            duration: ZERO_DURATION.to_string(),
        }
    }
}

impl AudioFile {
    pub fn new(path: PathBuf, tags: TrackTags) -> Self {
        let file_name = file_name_of(&path);
        Self {
            path,
            file_name,
            title: tags.title,
            artist: tags.artist,
            album: tags.album,
            duration: tags.duration,
        }
    }

    /// Track with placeholder metadata, used for unreadable files.
    pub fn untagged(path: PathBuf) -> Self {
        let tags = TrackTags::fallback(&file_name_of(&path));
        Self::new(path, tags)
    }

    pub fn display_name(&self) -> String {
        if self.artist == UNKNOWN {
            self.title.clone()
        } else {
            format!("{} - {}", self.artist, self.title)
        }
    }
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `m:ss`, or `h:mm:ss` past the hour.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
