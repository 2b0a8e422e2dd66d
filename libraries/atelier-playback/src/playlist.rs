//! Ordered, index-addressed playlist

use crate::error::{PlaybackError, Result};
use crate::types::Track;

/// Ordered list of tracks
///
/// Navigation wraps around at both ends.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Look up a track, failing with `InvalidIndex` when out of range
    pub fn track(&self, index: usize) -> Result<&Track> {
        self.tracks.get(index).ok_or(PlaybackError::InvalidIndex {
            index,
            len: self.tracks.len(),
        })
    }

    /// Append a track, returning its index
    pub fn push(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    /// Replace every track
    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
    }

    /// Index after `index`, wrapping to the start
    pub fn next_index(&self, index: usize) -> Result<usize> {
        if self.is_empty() {
            return Err(PlaybackError::EmptyPlaylist);
        }
        Ok((index + 1) % self.len())
    }

    /// Index before `index`, wrapping to the end
    pub fn previous_index(&self, index: usize) -> Result<usize> {
        if self.is_empty() {
            return Err(PlaybackError::EmptyPlaylist);
        }
        let len = self.len();
        Ok((index % len + len - 1) % len)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}

impl From<Vec<Track>> for Playlist {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(n: usize) -> Playlist {
        (0..n)
            .map(|i| {
                Track::new(
                    format!("Piece {i}"),
                    "Youth Orchestra",
                    "",
                    format!("audio/{i}.mp3"),
                )
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn next_wraps_at_end() {
        let list = playlist(3);
        assert_eq!(list.next_index(0).unwrap(), 1);
        assert_eq!(list.next_index(2).unwrap(), 0);
    }

    #[test]
    fn previous_wraps_at_start() {
        let list = playlist(3);
        assert_eq!(list.previous_index(0).unwrap(), 2);
        assert_eq!(list.previous_index(2).unwrap(), 1);
    }

    #[test]
    fn navigation_on_empty_playlist_fails() {
        let list = Playlist::default();
        assert_eq!(list.next_index(0), Err(PlaybackError::EmptyPlaylist));
        assert_eq!(list.previous_index(0), Err(PlaybackError::EmptyPlaylist));
    }

    #[test]
    fn out_of_range_lookup() {
        let list = playlist(2);
        assert_eq!(
            list.track(5).unwrap_err(),
            PlaybackError::InvalidIndex { index: 5, len: 2 }
        );
    }

    #[test]
    fn push_returns_new_index() {
        let mut list = playlist(2);
        let index = list.push(Track::new("Encore", "Choir", "", "audio/encore.mp3"));
        assert_eq!(index, 2);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn duplicates_are_allowed() {
        let mut list = playlist(1);
        let first = list.get(0).cloned().unwrap();
        list.push(first.clone());
        assert_eq!(list.get(1), Some(&first));
    }
}
