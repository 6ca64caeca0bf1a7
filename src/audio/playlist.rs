use super::track::AudioFile;
use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Artist,
    Album,
}

/// A named, ordered track list with its own cursor. Memory only.
#[derive(Debug, Clone)]
pub struct Playlist {
    pub id: u32,
    pub name: String,
    tracks: Vec<AudioFile>,
    current: usize,
}

impl Playlist {
    fn new(id: u32, name: String) -> Self {
        Self {
            id,
            name,
            tracks: Vec::new(),
            current: 0,
        }
    }

    /// Add a track to the playlist. Returns false if it's already there.
    pub fn add_track(&mut self, track: AudioFile) -> bool {
        if self.tracks.iter().any(|t| t.path == track.path) {
            return false;
        }
        info!("Added track '{}' to playlist '{}'", track.path.display(), self.name);
        self.tracks.push(track);
        true
    }

    pub fn remove_track(&mut self, index: usize) -> Result<AudioFile> {
        if index >= self.tracks.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.tracks.len(),
            });
        }
        let removed = self.tracks.remove(index);
        if index < self.current {
            self.current -= 1;
        }
        if self.current >= self.tracks.len() {
            self.current = self.tracks.len().saturating_sub(1);
        }
        info!("Removed track '{}' from playlist '{}'", removed.path.display(), self.name);
        Ok(removed)
    }

    pub fn current(&self) -> Option<&AudioFile> {
        self.tracks.get(self.current)
    }

    pub fn next(&mut self) -> Option<&AudioFile> {
        if self.tracks.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.tracks.len();
        self.tracks.get(self.current)
    }

    pub fn previous(&mut self) -> Option<&AudioFile> {
        if self.tracks.is_empty() {
            return None;
        }
        let len = self.tracks.len();
        self.current = (self.current + len - 1) % len;
        self.tracks.get(self.current)
    }

    /// Shuffle, keeping whatever is current as current.
    pub fn shuffle(&mut self) {
        if self.tracks.len() < 2 {
            return;
        }
        let current = self.tracks.remove(self.current);
        self.tracks.shuffle(&mut rand::thread_rng());
        self.tracks.insert(0, current);
        self.current = 0;
    }

    /// Stable sort; the cursor follows its track.
    pub fn sort_by(&mut self, field: SortField, ascending: bool) {
        let current_path = self.current().map(|t| t.path.clone());

        self.tracks.sort_by(|a, b| {
            let ordering = match field {
                SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
                SortField::Artist => a.artist.to_lowercase().cmp(&b.artist.to_lowercase()),
                SortField::Album => a.album.to_lowercase().cmp(&b.album.to_lowercase()),
            };
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });

        if let Some(path) = current_path {
            self.current = self.tracks.iter().position(|t| t.path == path).unwrap_or(0);
        }
    }

    pub fn tracks(&self) -> &[AudioFile] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Manages all playlists - creation, deletion, the active one
#[derive(Debug, Default)]
pub struct PlaylistManager {
    playlists: BTreeMap<u32, Playlist>,
    active: Option<u32>,
    next_id: u32,
}

impl PlaylistManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new playlist. Names must be non-blank and unique.
    pub fn create_playlist(&mut self, name: &str) -> Result<u32> {
        let name = name.trim();
        if name.is_empty() || self.playlists.values().any(|p| p.name == name) {
            return Err(Error::InvalidPlaylistName(name.to_string()));
        }

        self.next_id += 1;
        let id = self.next_id;
        self.playlists.insert(id, Playlist::new(id, name.to_string()));
        if self.active.is_none() {
            self.active = Some(id);
        }

        info!("Created new playlist: '{}'", name);
        Ok(id)
    }

    pub fn delete_playlist(&mut self, id: u32) -> Result<Playlist> {
        let playlist = self.playlists.remove(&id).ok_or(Error::PlaylistNotFound(id))?;
        if self.active == Some(id) {
            self.active = None;
        }
        info!("Deleted playlist: '{}'", playlist.name);
        Ok(playlist)
    }

    pub fn get_playlist(&self, id: u32) -> Option<&Playlist> {
        self.playlists.get(&id)
    }

    pub fn get_playlist_mut(&mut self, id: u32) -> Result<&mut Playlist> {
        self.playlists.get_mut(&id).ok_or(Error::PlaylistNotFound(id))
    }

    pub fn set_active(&mut self, id: u32) -> Result<()> {
        if !self.playlists.contains_key(&id) {
            return Err(Error::PlaylistNotFound(id));
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn active(&self) -> Option<&Playlist> {
        self.active.and_then(|id| self.playlists.get(&id))
    }

    pub fn active_mut(&mut self) -> Option<&mut Playlist> {
        self.active.and_then(|id| self.playlists.get_mut(&id))
    }

    pub fn add_track_to_playlist(&mut self, id: u32, track: AudioFile) -> Result<bool> {
        Ok(self.get_playlist_mut(id)?.add_track(track))
    }

    pub fn remove_track_from_playlist(&mut self, id: u32, index: usize) -> Result<AudioFile> {
        self.get_playlist_mut(id)?.remove_track(index)
    }

    pub fn next_track(&mut self) -> Option<&AudioFile> {
        self.active_mut()?.next()
    }

    pub fn previous_track(&mut self) -> Option<&AudioFile> {
        self.active_mut()?.previous()
    }

    pub fn current_track(&self) -> Option<&AudioFile> {
        self.active()?.current()
    }

    /// In creation order.
    pub fn list_playlists(&self) -> Vec<&Playlist> {
        self.playlists.values().collect()
    }

    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::TrackTags;
    use std::path::PathBuf;

    fn track(name: &str, artist: &str) -> AudioFile {
        AudioFile::new(
            PathBuf::from(format!("/music/{name}.mp3")),
            TrackTags {
                title: name.to_string(),
                artist: artist.to_string(),
                album: "Album".to_string(),
                duration: "2:00".to_string(),
            },
        )
    }

    fn titles(playlist: &Playlist) -> Vec<&str> {
        playlist.tracks().iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn names_must_be_present_and_unique() {
        let mut manager = PlaylistManager::new();
        assert!(matches!(manager.create_playlist("  "), Err(Error::InvalidPlaylistName(_))));
        manager.create_playlist("Road Trip").unwrap();
        assert!(matches!(
            manager.create_playlist("Road Trip"),
            Err(Error::InvalidPlaylistName(_))
        ));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn first_playlist_becomes_active() {
        let mut manager = PlaylistManager::new();
        let first = manager.create_playlist("One").unwrap();
        let second = manager.create_playlist("Two").unwrap();
        assert_eq!(manager.active().unwrap().id, first);

        manager.set_active(second).unwrap();
        assert_eq!(manager.active().unwrap().name, "Two");
        assert!(matches!(manager.set_active(99), Err(Error::PlaylistNotFound(99))));
    }

    #[test]
    fn deleting_active_clears_it() {
        let mut manager = PlaylistManager::new();
        let id = manager.create_playlist("Gone").unwrap();
        manager.delete_playlist(id).unwrap();
        assert!(manager.active().is_none());
        assert!(manager.current_track().is_none());
        assert!(matches!(manager.delete_playlist(id), Err(Error::PlaylistNotFound(_))));
    }

    #[test]
    fn tracks_dedupe_and_remove_by_index() {
        let mut manager = PlaylistManager::new();
        let id = manager.create_playlist("Mix").unwrap();
        assert!(manager.add_track_to_playlist(id, track("a", "x")).unwrap());
        assert!(!manager.add_track_to_playlist(id, track("a", "x")).unwrap());
        manager.add_track_to_playlist(id, track("b", "x")).unwrap();

        let err = manager.remove_track_from_playlist(id, 2).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(manager.remove_track_from_playlist(id, 0).unwrap().title, "a");
        assert_eq!(titles(manager.get_playlist(id).unwrap()), vec!["b"]);
    }

    #[test]
    fn navigation_wraps_on_active_playlist() {
        let mut manager = PlaylistManager::new();
        let id = manager.create_playlist("Loop").unwrap();
        for name in ["a", "b", "c"] {
            manager.add_track_to_playlist(id, track(name, "x")).unwrap();
        }

        assert_eq!(manager.current_track().unwrap().title, "a");
        assert_eq!(manager.previous_track().unwrap().title, "c");
        assert_eq!(manager.next_track().unwrap().title, "a");
        assert_eq!(manager.next_track().unwrap().title, "b");
    }

    #[test]
    fn sort_moves_cursor_with_track() {
        let mut manager = PlaylistManager::new();
        let id = manager.create_playlist("Sorted").unwrap();
        for (name, artist) in [("delta", "b"), ("alpha", "c"), ("charlie", "a")] {
            manager.add_track_to_playlist(id, track(name, artist)).unwrap();
        }
        manager.next_track();

        let playlist = manager.get_playlist_mut(id).unwrap();
        playlist.sort_by(SortField::Title, true);
        assert_eq!(titles(playlist), vec!["alpha", "charlie", "delta"]);
        assert_eq!(playlist.current().unwrap().title, "alpha");

        playlist.sort_by(SortField::Artist, false);
        assert_eq!(titles(playlist), vec!["alpha", "delta", "charlie"]);
        assert_eq!(playlist.current().unwrap().title, "alpha");
    }

    #[test]
    fn shuffle_keeps_current() {
        let mut manager = PlaylistManager::new();
        let id = manager.create_playlist("Shuffle").unwrap();
        for i in 0..10 {
            manager.add_track_to_playlist(id, track(&format!("t{i}"), "x")).unwrap();
        }
        manager.next_track();
        manager.next_track();

        let playlist = manager.get_playlist_mut(id).unwrap();
        playlist.shuffle();
        assert_eq!(playlist.current().unwrap().title, "t2");
        assert_eq!(playlist.len(), 10);
    }
}
