//! Error types for the playback controller

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Playback errors
///
/// Errors are values that settle a single action. None of them poison the
/// controller: the action queue moves on to the next submission.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum PlaybackError {
    /// Track index outside the playlist
    #[error("Track index {index} out of range (playlist has {len} tracks)")]
    InvalidIndex { index: usize, len: usize },

    /// Output never reported ready within the load timeout
    #[error("Track {index} did not become ready within {timeout:?}")]
    LoadTimeout { index: usize, timeout: Duration },

    /// Output refused a play command (decode or network failure)
    #[error("Output rejected play: {0}")]
    PlayRejected(String),

    /// Asynchronous error reported by the bound output
    #[error("Output error: {0}")]
    Output(String),

    /// No output is bound to a track
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Operation needs at least one track
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// The controller worker has shut down
    #[error("Playback controller is closed")]
    ControllerClosed,
}

impl PlaybackError {
    /// Short message for inline rendering next to the player controls
    pub fn user_message(&self) -> &'static str {
        match self {
            PlaybackError::LoadTimeout { .. } | PlaybackError::Output(_) => "couldn't load track",
            PlaybackError::PlayRejected(_) => "couldn't play track",
            PlaybackError::InvalidIndex { .. } => "no such track",
            PlaybackError::NoTrackLoaded => "no track loaded",
            PlaybackError::EmptyPlaylist => "playlist is empty",
            PlaybackError::ControllerClosed => "player stopped",
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_failures_share_inline_message() {
        let timeout = PlaybackError::LoadTimeout {
            index: 2,
            timeout: Duration::from_secs(10),
        };
        let output = PlaybackError::Output("network lost".to_string());

        assert_eq!(timeout.user_message(), "couldn't load track");
        assert_eq!(output.user_message(), "couldn't load track");
    }

    #[test]
    fn display_includes_context() {
        let err = PlaybackError::InvalidIndex { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "Track index 7 out of range (playlist has 3 tracks)"
        );
    }
}
