//! Core types for the playback controller

use crate::error::PlaybackError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A playable entry of the sidebar playlist
///
/// Tracks are immutable values. Their identity is their position in the
/// playlist, so the same recording may appear more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Track title
    pub title: String,

    /// Performing artist or ensemble
    pub artist: String,

    /// Reference to cover artwork (URL or asset path)
    #[serde(default)]
    pub artwork: String,

    /// URI handed to the audio output
    #[serde(alias = "source")]
    pub source_uri: String,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        artwork: impl Into<String>,
        source_uri: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            artwork: artwork.into(),
            source_uri: source_uri.into(),
        }
    }
}

/// Controller state machine
///
/// Seeking is tracked separately (`PlaybackState::is_seeking`) because it can
/// happen while playing or paused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlayerStatus {
    /// No track loaded yet
    Idle,

    /// Waiting for the output to report ready
    Loading { index: usize },

    /// Track ready, not playing
    Paused { index: usize },

    /// Output is playing
    Playing { index: usize },

    /// Last load or play attempt failed; transport controls stay usable
    Errored { index: usize, cause: PlaybackError },
}

impl PlayerStatus {
    /// Track index the status refers to
    pub fn index(&self) -> Option<usize> {
        match self {
            PlayerStatus::Idle => None,
            PlayerStatus::Loading { index }
            | PlayerStatus::Paused { index }
            | PlayerStatus::Playing { index }
            | PlayerStatus::Errored { index, .. } => Some(*index),
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlayerStatus::Playing { .. })
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, PlayerStatus::Errored { .. })
    }
}

/// Configuration for the playback controller
///
/// The timing values are tuned defaults, not invariants. Any positive values
/// keep the queue's ordering guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// How long a load may wait for the output to become ready (default: 10s)
    pub load_timeout_ms: u64,

    /// How long position read-backs are ignored after a seek (default: 100ms)
    pub seek_debounce_ms: u64,

    /// Pause between two queued actions (default: 50ms)
    pub settle_delay_ms: u64,

    /// Past this position "previous" restarts the current track (default: 3s)
    pub restart_threshold_ms: u64,

    /// Initial volume (0-100, default: 75)
    pub initial_volume: u8,

    /// Volume restored by unmute when nothing was remembered (default: 75)
    pub unmute_volume: u8,

    /// Capacity of the event broadcast channel (default: 64)
    pub event_capacity: usize,
}

impl PlaybackConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn seek_debounce(&self) -> Duration {
        Duration::from_millis(self.seek_debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn restart_threshold(&self) -> Duration {
        Duration::from_millis(self.restart_threshold_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: 10_000,
            seek_debounce_ms: 100,
            settle_delay_ms: 50,
            restart_threshold_ms: 3_000,
            initial_volume: 75,
            unmute_volume: 75,
            event_capacity: 64,
        }
    }
}

/// Everything a UI needs to render the player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub status: PlayerStatus,
    pub current_index: usize,
    pub track: Option<Track>,
    pub is_playing: bool,
    pub is_loading: bool,
    pub is_seeking: bool,
    pub is_buffering: bool,
    pub volume: u8,
    pub is_muted: bool,
    pub elapsed: Duration,
    /// Duration of the current track, if the output reported one
    pub duration: Option<Duration>,
    /// Known duration per playlist row; `None` renders as unknown
    pub durations: Vec<Option<Duration>>,
    pub has_user_interacted: bool,
}

impl PlayerSnapshot {
    /// Playback progress in `[0, 1]`, if the duration is known
    pub fn progress(&self) -> Option<f64> {
        let duration = self.duration?;
        if duration.is_zero() {
            return None;
        }
        Some((self.elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0))
    }

    pub fn playlist_len(&self) -> usize {
        self.durations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlaybackConfig::default();
        assert_eq!(config.load_timeout(), Duration::from_secs(10));
        assert_eq!(config.seek_debounce(), Duration::from_millis(100));
        assert_eq!(config.settle_delay(), Duration::from_millis(50));
        assert_eq!(config.restart_threshold(), Duration::from_secs(3));
        assert_eq!(config.initial_volume, 75);
    }

    #[test]
    fn status_index() {
        assert_eq!(PlayerStatus::Idle.index(), None);
        assert_eq!(PlayerStatus::Loading { index: 3 }.index(), Some(3));
        let errored = PlayerStatus::Errored {
            index: 1,
            cause: PlaybackError::EmptyPlaylist,
        };
        assert_eq!(errored.index(), Some(1));
        assert!(errored.is_errored());
    }

    #[test]
    fn track_accepts_source_alias() {
        let json = r#"{"title":"Etude","artist":"Studio B","source":"audio/etude.mp3"}"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.source_uri, "audio/etude.mp3");
        assert!(track.artwork.is_empty());
    }

    #[test]
    fn snapshot_progress_requires_duration() {
        let mut snapshot = PlayerSnapshot {
            status: PlayerStatus::Idle,
            current_index: 0,
            track: None,
            is_playing: false,
            is_loading: false,
            is_seeking: false,
            is_buffering: false,
            volume: 75,
            is_muted: false,
            elapsed: Duration::from_secs(30),
            duration: None,
            durations: vec![None],
            has_user_interacted: false,
        };
        assert_eq!(snapshot.progress(), None);

        snapshot.duration = Some(Duration::from_secs(120));
        assert_eq!(snapshot.progress(), Some(0.25));
    }
}
