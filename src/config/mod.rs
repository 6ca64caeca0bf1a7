// Configuration management for tapedeck
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub playback: PlaybackConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub recursive: bool,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub initial_volume: f64, // percent, 0-100
    pub volume_step: f64,
    pub skip_seconds: u64,
    pub max_gain_db: f32,
    pub finish_threshold: f64, // fraction of the track that counts as "done"
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub status_timeout_ms: u64,
    pub search_debounce_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: Option<PathBuf>,
    pub filter: Option<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            extensions: vec!["mp3".to_string()],
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            initial_volume: 50.0,
            volume_step: 5.0,
            skip_seconds: 10,
            max_gain_db: 6.0,
            finish_threshold: 0.99, // decode/output buffering means 100% lags the real end
            tick_interval_ms: 100,  // ~10 refreshes a second
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            status_timeout_ms: 3000,
            search_debounce_ms: 200,
        }
    }
}

impl PlaybackConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl UiConfig {
    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl LoggingConfig {
    pub fn log_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tapedeck")
                .join("logs")
        })
    }
}

impl Config {
    /// Load from the default location, writing defaults out on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config.sanitized())
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("tapedeck");

        Ok(config_dir.join("config.toml"))
    }

    /// Clamp anything a hand-edited file could push out of range.
    fn sanitized(mut self) -> Self {
        let p = &mut self.playback;
        p.initial_volume = p.initial_volume.clamp(0.0, 100.0);
        p.volume_step = p.volume_step.clamp(0.0, 100.0);
        if !(p.finish_threshold > 0.0 && p.finish_threshold <= 1.0) {
            p.finish_threshold = PlaybackConfig::default().finish_threshold;
        }
        p.tick_interval_ms = p.tick_interval_ms.max(10);

        if self.library.extensions.is_empty() {
            self.library.extensions = LibraryConfig::default().extensions;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.playback.skip_seconds, 10);
        assert_eq!(config.library.extensions, vec!["mp3".to_string()]);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[playback]\nskip_seconds = 30\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.playback.skip_seconds, 30);
        assert_eq!(config.playback.tick_interval_ms, 100);
        assert_eq!(config.ui.status_timeout_ms, 3000);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[playback]\ninitial_volume = 250.0\nfinish_threshold = 1.5\ntick_interval_ms = 0\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.playback.initial_volume, 100.0);
        assert_eq!(config.playback.finish_threshold, 0.99);
        assert_eq!(config.playback.tick_interval_ms, 10);
    }
}
