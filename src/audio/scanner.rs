use super::metadata::MetadataCache;
use super::track::AudioFile;
use crate::config::LibraryConfig;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Walks a library directory and turns every supported file into an
/// [`AudioFile`]. Per-file problems never abort a scan.
#[derive(Clone)]
pub struct MusicScanner {
    supported_extensions: Vec<String>,
    recursive: bool,
    cache: MetadataCache,
}

impl MusicScanner {
    pub fn new() -> Self {
        Self::from_config(&LibraryConfig::default(), MetadataCache::new())
    }

    pub fn from_config(config: &LibraryConfig, cache: MetadataCache) -> Self {
        Self {
            supported_extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            recursive: config.recursive,
            cache,
        }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Scan `path`. Only an unreadable top-level directory is an error;
    /// results are sorted by path so a rescan gives the same order.
    pub fn scan_directory<P: AsRef<Path>>(&self, path: P) -> Result<Vec<AudioFile>> {
        let root = path.as_ref();
        fs::read_dir(root).map_err(|source| Error::LibraryUnavailable {
            path: root.to_path_buf(),
            source,
        })?;

        info!("Scanning {}", root.display());

        let mut walker = WalkDir::new(root).follow_links(true).sort_by_file_name();
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        let mut tracks = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();

            // Skip hidden files (dotfiles)
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with('.'))
            {
                continue;
            }

            if self.is_supported_file(path) {
                let tags = self.cache.read(path);
                debug!("Found {} ({})", path.display(), tags.title);
                tracks.push(AudioFile::new(path.to_path_buf(), tags));
            }
        }

        tracks.sort_by(|a, b| a.path.cmp(&b.path));
        info!("Scan of {} complete: {} tracks", root.display(), tracks.len());

        Ok(tracks)
    }

    pub fn is_supported_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let normalized = ext.to_ascii_lowercase();
                self.supported_extensions.contains(&normalized)
            })
            .unwrap_or(false)
    }
}

impl Default for MusicScanner {
    fn default() -> Self {
        Self::new()
    }
}
