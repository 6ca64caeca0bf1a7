pub mod decode;
pub mod library;
pub mod metadata;
pub mod player;
pub mod playlist;
pub mod progress;
pub mod queue;
pub mod scanner;
pub mod source;
pub mod track;
pub mod volume;

pub use decode::{DecodedStream, Mp3Opener, StreamOpener};
pub use library::Library;
pub use metadata::MetadataCache;
pub use player::{AudioPlayer, PlaybackSnapshot, PlayerEvent};
pub use playlist::{Playlist, PlaylistManager, SortField};
pub use progress::{advance_after_finish, evaluate_tick, Handoff, TickOutcome};
pub use queue::Queue;
pub use scanner::MusicScanner;
pub use track::{format_duration, AudioFile};
pub use volume::VolumeControl;

use crate::config::PlaybackConfig;
use std::time::Duration;

/// Engine settings pulled out of the `[playback]` config section.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub initial_volume: f64, // percent
    pub max_gain_db: f32,
    pub finish_threshold: f64,
    pub skip: Duration,
}

impl Default for AudioConfig {
    fn default() -> Self {
        PlaybackConfig::default().into()
    }
}

impl From<PlaybackConfig> for AudioConfig {
    fn from(config: PlaybackConfig) -> Self {
        Self {
            initial_volume: config.initial_volume,
            max_gain_db: config.max_gain_db,
            finish_threshold: config.finish_threshold,
            skip: Duration::from_secs(config.skip_seconds),
        }
    }
}
