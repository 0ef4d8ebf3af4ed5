use crate::track::Track;

/// Ordered play queue with a cursor.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    current: Option<usize>,
}

impl Playlist {
    #[must_use]
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            current: None,
        }
    }

    /// Replace the whole queue. The cursor is placed at `start` when it is in
    /// range, otherwise cleared.
    pub fn replace(&mut self, tracks: Vec<Track>, start: Option<usize>) {
        self.current = start.filter(|&i| i < tracks.len());
        self.tracks = tracks;
    }

    pub fn append(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.tracks.extend(tracks);
    }

    /// Remove every entry for `track_id`. The cursor keeps pointing at the same
    /// track when that track survives; if the current track itself is removed
    /// the cursor stays at the same slot (clamped), or clears when the queue
    /// empties.
    ///
    /// Returns whether anything was removed.
    pub fn remove_by_id(&mut self, track_id: u64) -> bool {
        let before = self.tracks.len();
        let removed_before_cursor = self.current.map_or(0, |current| {
            self.tracks[..current]
                .iter()
                .filter(|t| t.id == track_id)
                .count()
        });

        self.tracks.retain(|t| t.id != track_id);
        if self.tracks.len() == before {
            return false;
        }

        self.current = match self.current {
            _ if self.tracks.is_empty() => None,
            Some(current) => Some((current - removed_before_cursor).min(self.tracks.len() - 1)),
            None => None,
        };
        true
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current?)
    }

    /// Move the cursor. Out-of-range indices are ignored.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.current = Some(index);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Index after the cursor, wrapping to the start
    #[must_use]
    pub fn next_index(&self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        Some(self.current.map_or(0, |i| (i + 1) % self.tracks.len()))
    }

    /// Index before the cursor, wrapping to the end
    #[must_use]
    pub fn prev_index(&self) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }
        Some(self.current.map_or(0, |i| (i + len - 1) % len))
    }

    /// Whether a track follows the cursor without wrapping
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current.is_some_and(|i| i + 1 < self.tracks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{track, tracks};

    #[test]
    fn test_wraparound() {
        let mut playlist = Playlist::new(tracks(3));
        playlist.set_current(2);
        assert_eq!(playlist.next_index(), Some(0));
        assert!(!playlist.has_next());

        playlist.set_current(0);
        assert_eq!(playlist.prev_index(), Some(2));
        assert!(playlist.has_next());
    }

    #[test]
    fn test_empty_playlist_has_no_targets() {
        let playlist = Playlist::default();
        assert_eq!(playlist.next_index(), None);
        assert_eq!(playlist.prev_index(), None);
        assert!(playlist.current().is_none());
    }

    #[test]
    fn test_replace_validates_start() {
        let mut playlist = Playlist::default();
        playlist.replace(tracks(2), Some(1));
        assert_eq!(playlist.current().unwrap().id, 2);

        playlist.replace(tracks(2), Some(5));
        assert_eq!(playlist.current_index(), None);
        assert!(!playlist.set_current(2));
    }

    #[test]
    fn test_append() {
        let mut playlist = Playlist::new(tracks(1));
        playlist.append([track(9, "Nine", 1000)]);
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.get(1).unwrap().title, "Nine");
    }

    #[test]
    fn test_remove_before_cursor_keeps_current_track() {
        let mut playlist = Playlist::new(tracks(4));
        playlist.set_current(2);
        assert!(playlist.remove_by_id(1));
        assert_eq!(playlist.current().unwrap().id, 3);
        assert!(!playlist.remove_by_id(42));
    }

    #[test]
    fn test_remove_current_track() {
        let mut playlist = Playlist::new(tracks(3));
        playlist.set_current(2);
        playlist.remove_by_id(3);
        assert_eq!(playlist.current_index(), Some(1));
        assert_eq!(playlist.current().unwrap().id, 2);

        playlist.remove_by_id(1);
        playlist.remove_by_id(2);
        assert!(playlist.is_empty());
        assert_eq!(playlist.current_index(), None);
    }
}
