//! Playback Events
//!
//! Two event streams meet in the controller:
//! - [`OutputEvent`]: what the bound audio output reports (ready, buffering,
//!   playing, paused, progress, ended, error)
//! - [`PlaybackEvent`]: what the controller tells the UI

use crate::types::PlayerStatus;
use serde::Serialize;
use std::time::Duration;

/// Notifications emitted by an audio output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    /// Enough data is buffered to start playing
    Ready {
        /// Track length, if the output could determine it
        duration: Option<Duration>,
    },

    /// Playback stalled waiting for data
    Buffering,

    /// Output started (or resumed) playing
    Playing,

    /// Output paused, including pauses not requested by the controller
    Paused,

    /// Periodic position report
    Progress { position: Duration },

    /// Track played to the end
    Ended,

    /// Load or stream failure
    Error { message: String },
}

/// Events emitted by the controller for UI synchronization
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// Status changed (loading, playing, paused, errored, ...)
    StateChanged { status: PlayerStatus },

    /// A different track became current
    TrackChanged {
        index: usize,
        previous_index: Option<usize>,
    },

    /// Track finished playing naturally
    TrackFinished { index: usize },

    /// Autoplay was requested before any user gesture, so the track only loaded
    AutoplaySuppressed { index: usize },

    /// Position update
    PositionUpdate {
        position_ms: u64,
        duration_ms: Option<u64>,
    },

    /// Volume changed
    VolumeChanged { level: u8, is_muted: bool },

    /// Playlist grew or was replaced
    PlaylistChanged { length: usize },

    /// Error surfaced to the UI
    Error {
        index: Option<usize>,
        message: String,
    },
}

impl PlaybackEvent {
    pub(crate) fn position(position: Duration, duration: Option<Duration>) -> Self {
        PlaybackEvent::PositionUpdate {
            position_ms: millis(position),
            duration_ms: duration.map(millis),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
