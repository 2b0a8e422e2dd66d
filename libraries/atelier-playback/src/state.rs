//! Playback state and its transition table
//!
//! `PlaybackState` is the single source of truth for what the player is doing.
//! It is only mutated by the controller worker, and status changes only happen
//! through [`PlaybackState::apply`] with a named [`Transition`]:
//!
//! ```text
//! Idle ──LoadStarted──▶ Loading(i) ──Ready──────────▶ Paused(i) ◀──Paused/Started──▶ Playing(i)
//!                          │ └──Ready(playing)─────────────────────────────────────▶ Playing(i)
//!                          └──Failed──▶ Errored(i)      Paused(i) ◀──Ended── Playing(i)
//! any ──LoadStarted(j)──▶ Loading(j)          any ──Failed──▶ Errored     any ──Reset──▶ Idle
//! ```

use crate::error::PlaybackError;
use crate::playlist::Playlist;
use crate::types::{PlaybackConfig, PlayerSnapshot, PlayerStatus};
use crate::volume::Volume;
use std::collections::HashMap;
use std::time::Duration;

/// Named state machine inputs
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// A new output was acquired for `index`
    LoadStarted { index: usize },

    /// The output finished loading; `playing` when autoplay already started it
    Ready {
        duration: Option<Duration>,
        playing: bool,
    },

    /// The output resumed playing
    Started,

    /// The output paused (controller request or external)
    Paused,

    /// The output reached the end of the track
    Ended,

    /// Load or play failed
    Failed(PlaybackError),

    /// Output released without replacement
    Reset,
}

/// Mutable playback state
#[derive(Debug, Clone)]
pub struct PlaybackState {
    status: PlayerStatus,
    current_index: usize,
    is_playing: bool,
    is_loading: bool,
    is_seeking: bool,
    is_buffering: bool,
    has_user_interacted: bool,
    volume: Volume,
    elapsed: Duration,
    track_durations: HashMap<usize, Duration>,
}

impl PlaybackState {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            status: PlayerStatus::Idle,
            current_index: 0,
            is_playing: false,
            is_loading: false,
            is_seeking: false,
            is_buffering: false,
            has_user_interacted: false,
            volume: Volume::new(config.initial_volume, config.unmute_volume),
            elapsed: Duration::ZERO,
            track_durations: HashMap::new(),
        }
    }

    /// Apply a transition
    ///
    /// Returns false (and leaves the state untouched) when the transition is not
    /// valid from the current status.
    pub fn apply(&mut self, transition: Transition) -> bool {
        let next = match transition {
            Transition::LoadStarted { index } => {
                self.current_index = index;
                self.is_loading = true;
                self.is_playing = false;
                self.is_buffering = false;
                self.elapsed = Duration::ZERO;
                PlayerStatus::Loading { index }
            }
            Transition::Ready { duration, playing } => match self.status {
                PlayerStatus::Loading { index } => {
                    if let Some(duration) = duration {
                        self.track_durations.insert(index, duration);
                    }
                    self.is_loading = false;
                    self.is_buffering = false;
                    self.is_playing = playing;
                    if playing {
                        PlayerStatus::Playing { index }
                    } else {
                        PlayerStatus::Paused { index }
                    }
                }
                _ => return self.reject(&Transition::Ready { duration, playing }),
            },
            Transition::Started => match self.status {
                PlayerStatus::Paused { index } => {
                    self.is_playing = true;
                    self.is_buffering = false;
                    PlayerStatus::Playing { index }
                }
                _ => return self.reject(&Transition::Started),
            },
            Transition::Paused => match self.status {
                PlayerStatus::Playing { index } => {
                    self.is_playing = false;
                    PlayerStatus::Paused { index }
                }
                _ => return self.reject(&Transition::Paused),
            },
            Transition::Ended => match self.status {
                PlayerStatus::Playing { index } | PlayerStatus::Paused { index } => {
                    self.is_playing = false;
                    self.is_buffering = false;
                    PlayerStatus::Paused { index }
                }
                _ => return self.reject(&Transition::Ended),
            },
            Transition::Failed(cause) => {
                let index = self.status.index().unwrap_or(self.current_index);
                self.is_loading = false;
                self.is_playing = false;
                self.is_buffering = false;
                PlayerStatus::Errored { index, cause }
            }
            Transition::Reset => {
                self.is_loading = false;
                self.is_playing = false;
                self.is_seeking = false;
                self.is_buffering = false;
                self.elapsed = Duration::ZERO;
                PlayerStatus::Idle
            }
        };

        self.status = next;
        true
    }

    fn reject(&self, transition: &Transition) -> bool {
        tracing::trace!(status = ?self.status, ?transition, "Ignoring transition");
        false
    }

    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Point at a track without loading it
    pub(crate) fn set_current_index(&mut self, index: usize) {
        self.current_index = index;
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_seeking(&self) -> bool {
        self.is_seeking
    }

    pub fn is_buffering(&self) -> bool {
        self.is_buffering
    }

    pub(crate) fn set_buffering(&mut self, buffering: bool) {
        self.is_buffering = buffering;
    }

    pub fn has_user_interacted(&self) -> bool {
        self.has_user_interacted
    }

    /// Record a user gesture; never reverts
    pub(crate) fn latch_interaction(&mut self) {
        self.has_user_interacted = true;
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub(crate) fn volume_mut(&mut self) -> &mut Volume {
        &mut self.volume
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Store a position read-back from the output
    ///
    /// Ignored while a seek is settling so the read-back cannot undo the write.
    pub(crate) fn observe_position(&mut self, position: Duration) -> bool {
        if self.is_seeking {
            return false;
        }
        self.elapsed = position;
        true
    }

    /// Position written by the controller itself (seek, restart)
    pub(crate) fn set_elapsed(&mut self, position: Duration) {
        self.elapsed = position;
    }

    pub(crate) fn begin_seek(&mut self, position: Duration) {
        self.is_seeking = true;
        self.elapsed = position;
    }

    pub(crate) fn end_seek(&mut self) {
        self.is_seeking = false;
    }

    pub fn duration_of(&self, index: usize) -> Option<Duration> {
        self.track_durations.get(&index).copied()
    }

    pub(crate) fn record_duration(&mut self, index: usize, duration: Duration) {
        self.track_durations.insert(index, duration);
    }

    pub(crate) fn clear_durations(&mut self) {
        self.track_durations.clear();
    }

    /// Build the render snapshot for `playlist`
    pub fn snapshot(&self, playlist: &Playlist) -> PlayerSnapshot {
        PlayerSnapshot {
            status: self.status.clone(),
            current_index: self.current_index,
            track: playlist.get(self.current_index).cloned(),
            is_playing: self.is_playing,
            is_loading: self.is_loading,
            is_seeking: self.is_seeking,
            is_buffering: self.is_buffering,
            volume: self.volume.level(),
            is_muted: self.volume.is_muted(),
            elapsed: self.elapsed,
            duration: self.duration_of(self.current_index),
            durations: (0..playlist.len()).map(|i| self.duration_of(i)).collect(),
            has_user_interacted: self.has_user_interacted,
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(&PlaybackConfig::default())
    }
}
