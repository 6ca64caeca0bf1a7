// Error types shared by the playback engine, queue, library and playlists
// Everything in the core returns these; only startup turns them into a hard exit

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// File could not be opened or is not a valid stream of the supported format.
    #[error("cannot decode '{}': {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// Operation needs an open stream and none is open.
    #[error("nothing is playing")]
    NoActivePlayback,

    #[error("stream does not support seeking")]
    SeekUnsupported,

    #[error("seek failed: {0}")]
    Seek(String),

    #[error("index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("playlist {0} not found")]
    PlaylistNotFound(u32),

    #[error("invalid playlist name '{0}'")]
    InvalidPlaylistName(String),

    #[error("cannot read library directory '{}': {source}", path.display())]
    LibraryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Benign errors are shown as plain status text, not as failures.
    pub fn is_benign(&self) -> bool {
        matches!(self, Error::NoActivePlayback)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_the_file() {
        let err = Error::decode("/music/broken.mp3", "not an mp3");
        assert_eq!(err.to_string(), "cannot decode '/music/broken.mp3': not an mp3");
    }

    #[test]
    fn only_missing_playback_is_benign() {
        assert!(Error::NoActivePlayback.is_benign());
        assert!(!Error::SeekUnsupported.is_benign());
        assert!(!Error::IndexOutOfRange { index: 5, len: 3 }.is_benign());
    }
}
