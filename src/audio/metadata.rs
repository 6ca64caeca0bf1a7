// Tag reading with a per-path memo
// The cache lock only guards the map, files are read with it released

use super::track::{file_name_of, format_duration, TrackTags};
use anyhow::Result;
use id3::TagLike;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MetadataCache {
    entries: Arc<Mutex<HashMap<PathBuf, TrackTags>>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags for `path`. Never fails: unreadable files get fallback values.
    pub fn read(&self, path: &Path) -> TrackTags {
        if let Some(tags) = self.lookup(path) {
            return tags;
        }

        let tags = read_tags(path);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_path_buf())
            .or_insert(tags)
            .clone()
    }

    pub fn lookup(&self, path: &Path) -> Option<TrackTags> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_tags(path: &Path) -> TrackTags {
    let file_name = file_name_of(path);
    let mut tags = TrackTags::fallback(&file_name);

    match id3::Tag::read_from_path(path) {
        Ok(tag) => {
            if let Some(title) = tag.title().filter(|s| !s.is_empty()) {
                tags.title = title.to_string();
            }
            if let Some(artist) = tag.artist().filter(|s| !s.is_empty()) {
                tags.artist = artist.to_string();
            }
            if let Some(album) = tag.album().filter(|s| !s.is_empty()) {
                tags.album = album.to_string();
            }
            if let Some(ms) = tag.duration().filter(|ms| *ms > 0) {
                tags.duration = format_duration(Duration::from_millis(ms as u64));
                return tags;
            }
        }
        Err(e) => {
            debug!("No readable tag in {}: {}", path.display(), e);
        }
    }

    if let Ok(duration) = probe_duration(path) {
        tags.duration = format_duration(duration);
    }

    tags
}

/// Length of the file from the container headers.
#[cfg(feature = "probe")]
pub fn probe_duration(path: &Path) -> Result<Duration> {
    let (frames, sample_rate) = probe_frames(path)?;
    if sample_rate == 0 {
        return Err(anyhow::anyhow!("Stream reports no sample rate"));
    }
    Ok(Duration::from_secs_f64(frames as f64 / sample_rate as f64))
}

#[cfg(not(feature = "probe"))]
pub fn probe_duration(_path: &Path) -> Result<Duration> {
    Err(anyhow::anyhow!("Duration probing disabled"))
}

/// Total frame count and sample rate from the container headers.
#[cfg(feature = "probe")]
pub fn probe_frames(path: &Path) -> Result<(u64, u32)> {
    use std::fs::File;
    use symphonia::core::codecs::CODEC_TYPE_NULL;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow::anyhow!("No supported audio tracks found"))?;

    match (track.codec_params.n_frames, track.codec_params.sample_rate) {
        (Some(frames), Some(rate)) => Ok((frames, rate)),
        _ => Err(anyhow::anyhow!("Could not determine length from headers")),
    }
}

#[cfg(not(feature = "probe"))]
pub fn probe_frames(_path: &Path) -> Result<(u64, u32)> {
    Err(anyhow::anyhow!("Duration probing disabled"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use id3::{Tag, Version};
    use std::fs;
    use tempfile::tempdir;

    fn tagged_file(dir: &Path, name: &str, title: &str, artist: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, [0u8; 256]).unwrap();
        let mut tag = Tag::new();
        tag.set_title(title);
        tag.set_artist(artist);
        tag.set_album("Demo Album");
        tag.write_to_path(&path, Version::Id3v24).unwrap();
        path
    }

    #[test]
    fn reads_id3_fields() {
        let dir = tempdir().unwrap();
        let path = tagged_file(dir.path(), "a.mp3", "Night Drive", "The Wires");

        let tags = MetadataCache::new().read(&path);
        assert_eq!(tags.title, "Night Drive");
        assert_eq!(tags.artist, "The Wires");
        assert_eq!(tags.album, "Demo Album");
        assert_eq!(tags.duration, "0:00");
    }

    #[test]
    fn corrupt_file_gets_fallback_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.mp3");
        fs::write(&path, b"definitely not audio").unwrap();

        let tags = MetadataCache::new().read(&path);
        assert_eq!(tags, TrackTags::fallback("garbage.mp3"));
    }

    #[test]
    fn missing_file_gets_fallback_values() {
        let tags = MetadataCache::new().read(Path::new("/nope/not-here.mp3"));
        assert_eq!(tags.title, "not-here.mp3");
        assert_eq!(tags.artist, "Unknown");
    }

    #[test]
    fn second_read_comes_from_the_cache() {
        let dir = tempdir().unwrap();
        let path = tagged_file(dir.path(), "a.mp3", "First", "Artist");
        let cache = MetadataCache::new();

        assert_eq!(cache.read(&path).title, "First");

        // Retagging on disk is invisible once the path is memoised.
        fs::remove_file(&path).unwrap();
        assert_eq!(cache.read(&path).title, "First");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn parallel_first_reads_are_safe() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..8)
            .map(|i| tagged_file(dir.path(), &format!("{i}.mp3"), &format!("Song {i}"), "Band"))
            .collect();
        let cache = MetadataCache::new();

        std::thread::scope(|scope| {
            for path in &paths {
                let cache = cache.clone();
                scope.spawn(move || cache.read(path));
            }
        });

        assert_eq!(cache.len(), 8);
        assert_eq!(cache.lookup(&paths[3]).unwrap().title, "Song 3");
    }
}
