use super::track::AudioFile;
use crate::error::{Error, Result};
use rand::seq::SliceRandom;
use std::path::Path;
use tracing::info;

/// Play queue with a cursor.
///
/// Two ways forward: [`Queue::next`] wraps around (manual skipping), while
/// [`Queue::advance_and_get_next`] stops at the last track (auto-advance at
/// end of track), so a finished queue goes quiet instead of looping.
#[derive(Debug, Clone, Default)]
pub struct Queue {
    tracks: Vec<AudioFile>,
    current: usize,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track. Returns false if that path is already queued.
    pub fn add(&mut self, track: AudioFile) -> bool {
        if self.contains(&track.path) {
            return false;
        }
        info!("Queued {}", track.path.display());
        self.tracks.push(track);
        true
    }

    /// Remove by position. The cursor keeps pointing at the same track when
    /// an earlier one goes, and stays in range when the current one goes.
    pub fn remove(&mut self, index: usize) -> Result<AudioFile> {
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

        info!("Removed {} from queue", removed.path.display());
        Ok(removed)
    }

    /// Circular step forward.
    pub fn next(&mut self) -> Option<&AudioFile> {
        if self.tracks.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.tracks.len();
        self.tracks.get(self.current)
    }

    /// Circular step back.
    pub fn previous(&mut self) -> Option<&AudioFile> {
        if self.tracks.is_empty() {
            return None;
        }
        let len = self.tracks.len();
        self.current = (self.current + len - 1) % len;
        self.tracks.get(self.current)
    }

    pub fn current(&self) -> Option<&AudioFile> {
        self.tracks.get(self.current)
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.tracks.is_empty()).then_some(self.current)
    }

    /// Point the cursor at `index`.
    pub fn select(&mut self, index: usize) -> Result<&AudioFile> {
        let len = self.tracks.len();
        let track = self
            .tracks
            .get(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        self.current = index;
        Ok(track)
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = 0;
        info!("Queue cleared");
    }

    /// Linear step forward. `None` at the last track, cursor unchanged.
    pub fn advance_and_get_next(&mut self) -> Option<&AudioFile> {
        if self.current + 1 >= self.tracks.len() {
            return None;
        }
        self.current += 1;
        self.tracks.get(self.current)
    }

    /// Shuffle the order. The current track moves to the front so a linear
    /// run from here still reaches every other track.
    pub fn shuffle(&mut self) {
        if self.tracks.len() < 2 {
            return;
        }
        let current = self.tracks.remove(self.current);
        self.tracks.shuffle(&mut rand::thread_rng());
        self.tracks.insert(0, current);
        self.current = 0;
        info!("Queue shuffled ({} tracks)", self.tracks.len());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.tracks.iter().any(|t| t.path == path)
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn track(name: &str) -> AudioFile {
        AudioFile::untagged(PathBuf::from(format!("/music/{name}.mp3")))
    }

    fn queue_of(names: &[&str]) -> Queue {
        let mut queue = Queue::new();
        for name in names {
            queue.add(track(name));
        }
        queue
    }

    fn current_name(queue: &Queue) -> Option<String> {
        queue.current().map(|t| t.file_name.clone())
    }

    #[test]
    fn empty_queue_has_no_current() {
        let mut queue = Queue::new();
        assert!(queue.current().is_none());
        assert!(queue.current_index().is_none());
        assert!(queue.next().is_none());
        assert!(queue.previous().is_none());
        assert!(queue.advance_and_get_next().is_none());
    }

    #[test]
    fn duplicate_paths_are_ignored() {
        let mut queue = queue_of(&["a", "b"]);
        assert!(!queue.add(track("a")));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn next_wraps_but_advance_stops() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.select(2).unwrap();

        assert!(queue.clone().advance_and_get_next().is_none());
        let mut linear = queue.clone();
        linear.advance_and_get_next();
        assert_eq!(linear.current_index(), Some(2));

        assert_eq!(queue.next().unwrap().file_name, "a.mp3");
        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn previous_wraps_to_last() {
        let mut queue = queue_of(&["a", "b", "c"]);
        assert_eq!(queue.previous().unwrap().file_name, "c.mp3");
        assert_eq!(queue.current_index(), Some(2));
    }

    #[test]
    fn advance_walks_forward() {
        let mut queue = queue_of(&["a", "b", "c"]);
        assert_eq!(queue.advance_and_get_next().unwrap().file_name, "b.mp3");
        assert_eq!(queue.advance_and_get_next().unwrap().file_name, "c.mp3");
        assert!(queue.advance_and_get_next().is_none());
        assert_eq!(current_name(&queue).as_deref(), Some("c.mp3"));
    }

    #[test]
    fn remove_out_of_range_leaves_queue_alone() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.select(1).unwrap();

        let err = queue.remove(5).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 5, len: 3 }));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.current_index(), Some(1));
    }

    #[test]
    fn remove_keeps_cursor_on_same_track() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.select(2).unwrap();

        queue.remove(0).unwrap();
        assert_eq!(current_name(&queue).as_deref(), Some("c.mp3"));

        // Removing the last, current track pulls the cursor back in range
        queue.remove(1).unwrap();
        assert_eq!(current_name(&queue).as_deref(), Some("b.mp3"));

        queue.remove(0).unwrap();
        assert!(queue.current().is_none());
    }

    #[test]
    fn clear_resets_cursor() {
        let mut queue = queue_of(&["a", "b"]);
        queue.next();
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.current_index().is_none());

        queue.add(track("z"));
        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn shuffle_keeps_current_track_current() {
        let names: Vec<String> = (0..20).map(|i| format!("t{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut queue = queue_of(&refs);
        queue.select(7).unwrap();

        queue.shuffle();
        assert_eq!(queue.len(), 20);
        assert_eq!(queue.current_index(), Some(0));
        assert_eq!(current_name(&queue).as_deref(), Some("t7.mp3"));
        for name in &names {
            assert!(queue.contains(Path::new(&format!("/music/{name}.mp3"))));
        }
    }
}
