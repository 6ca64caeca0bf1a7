use super::track::AudioFile;
use fuzzy_matcher::clangd::ClangdMatcher;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// All known tracks, in scan order, unique by path.
///
/// Cloning is cheap: the track list is shared until one side mutates it, so
/// a search can run on a snapshot off the event loop.
#[derive(Debug, Clone, Default)]
pub struct Library {
    tracks: Arc<Vec<AudioFile>>,
    by_path: Arc<HashMap<PathBuf, usize>>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: Vec<AudioFile>) -> Self {
        let mut library = Self::new();
        for track in tracks {
            library.add_file(track);
        }
        info!("Library holds {} tracks", library.len());
        library
    }

    /// Returns false when the path is already present.
    pub fn add_file(&mut self, track: AudioFile) -> bool {
        if self.by_path.contains_key(&track.path) {
            return false;
        }
        let index = self.tracks.len();
        Arc::make_mut(&mut self.by_path).insert(track.path.clone(), index);
        Arc::make_mut(&mut self.tracks).push(track);
        true
    }

    pub fn remove(&mut self, path: &Path) -> Option<AudioFile> {
        let index = *self.by_path.get(path)?;
        let removed = Arc::make_mut(&mut self.tracks).remove(index);
        self.reindex();
        Some(removed)
    }

    fn reindex(&mut self) {
        self.by_path = Arc::new(
            self.tracks
                .iter()
                .enumerate()
                .map(|(i, t)| (t.path.clone(), i))
                .collect(),
        );
    }

    pub fn get(&self, path: &Path) -> Option<&AudioFile> {
        self.by_path.get(path).and_then(|&i| self.tracks.get(i))
    }

    pub fn get_index(&self, index: usize) -> Option<&AudioFile> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[AudioFile] {
        &self.tracks
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.tracks.iter().map(|t| t.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks = Arc::default();
        self.by_path = Arc::default();
    }

    /// Indices of matching tracks, best match first.
    pub fn search(&self, query: &str) -> Vec<usize> {
        search_tracks(&self.tracks, query)
    }
}

/// Every word of `query` must appear (case-insensitively) in the title,
/// artist, album or file name. Matches are ranked by fuzzy score, ties kept
/// in library order. An empty query matches everything.
pub fn search_tracks(tracks: &[AudioFile], query: &str) -> Vec<usize> {
    let query = query.trim().to_lowercase();
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.is_empty() {
        return (0..tracks.len()).collect();
    }

    let matcher = ClangdMatcher::default().ignore_case();
    let mut scored: Vec<(i64, usize)> = tracks
        .iter()
        .enumerate()
        .filter_map(|(index, track)| {
            let haystack = format!(
                "{} {} {} {}",
                track.title, track.artist, track.album, track.file_name
            )
            .to_lowercase();

            if !words.iter().all(|word| haystack.contains(word)) {
                return None;
            }

            let score = matcher.fuzzy_match(&haystack, &query).unwrap_or(0);
            Some((score, index))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, index)| index).collect()
}
