//! Public controller handle
//!
//! [`PlaybackController`] is a cheap, cloneable handle. Every method submits
//! its operation immediately and returns a [`Completion`] that resolves when
//! the worker has finished it. Transport actions (load, play, next, ...) are
//! serialized in call order; pause, seek and volume apply right away.

use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::output::OutputFactory;
use crate::playlist::Playlist;
use crate::queue::{self, Action, Command, Completion, Envelope};
use crate::types::{PlaybackConfig, PlayerSnapshot, Track};
use crate::worker::Worker;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

/// Handle to a running playback controller
///
/// The worker task runs until [`PlaybackController::shutdown`] is called or
/// every handle has been dropped.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    actions: mpsc::UnboundedSender<Envelope<Action>>,
    commands: mpsc::UnboundedSender<Envelope<Command>>,
    snapshot: watch::Receiver<PlayerSnapshot>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackController {
    /// Start a controller on the current tokio runtime
    ///
    /// Nothing is loaded until the first transport action.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(
        tracks: impl Into<Playlist>,
        factory: impl OutputFactory + 'static,
        config: PlaybackConfig,
    ) -> Self {
        let channels = Worker::spawn(tracks.into(), Box::new(factory), config);

        Self {
            actions: channels.actions_tx,
            commands: channels.commands_tx,
            snapshot: channels.snapshot_rx,
            events: channels.events_tx,
        }
    }

    // ===== Queued actions =====

    /// Load the track at `index`, optionally starting it once ready
    ///
    /// Autoplay only happens after the first user gesture; before that the
    /// track loads paused.
    pub fn load_track(&self, index: usize, autoplay: bool) -> Completion {
        self.action(Action::Load { index, autoplay })
    }

    /// Start playback, loading the current track first if nothing is bound
    ///
    /// After a failed load this is the retry path.
    pub fn play(&self) -> Completion {
        self.action(Action::Play)
    }

    /// Play when paused, pause when playing
    ///
    /// Ignored while a track is loading. The check reads the latest snapshot
    /// when this is called, not when the action would run: a toggle issued
    /// during a load is dropped and does not fire once the load finishes.
    /// The worker repeats the check when the action runs, for loads that
    /// start after submission.
    pub fn toggle_play(&self) -> Completion {
        if self.snapshot.borrow().is_loading {
            return Completion::ready(Ok(()));
        }
        self.action(Action::TogglePlay)
    }

    /// Advance to the next track (wraps around)
    pub fn next_track(&self) -> Completion {
        self.action(Action::Next)
    }

    /// Restart the current track or go to the previous one
    pub fn previous_track(&self) -> Completion {
        self.action(Action::Previous)
    }

    /// Playlist row click: toggle the current track or switch and play
    pub fn select_track(&self, index: usize) -> Completion {
        self.action(Action::Select { index })
    }

    /// Replace the whole playlist; the player returns to idle
    pub fn set_playlist(&self, tracks: Vec<Track>) -> Completion {
        self.action(Action::SetPlaylist(tracks))
    }

    // ===== Immediate commands =====

    pub fn pause(&self) -> Completion {
        self.command(Command::Pause)
    }

    /// Seek to a fraction (0.0-1.0) of the current track
    pub fn seek(&self, fraction: f64) -> Completion {
        self.command(Command::SeekFraction(fraction))
    }

    /// Seek to an absolute position, clamped to the track length
    pub fn seek_to(&self, position: Duration) -> Completion {
        self.command(Command::SeekTo(position))
    }

    /// Seek relative to the current position (negative goes back)
    pub fn seek_by(&self, offset_secs: f64) -> Completion {
        self.command(Command::SeekBy(offset_secs))
    }

    /// Set volume (0-100, clamped)
    pub fn set_volume(&self, level: u8) -> Completion {
        self.command(Command::SetVolume(level))
    }

    pub fn adjust_volume(&self, delta: i16) -> Completion {
        self.command(Command::AdjustVolume(delta))
    }

    pub fn toggle_mute(&self) -> Completion {
        self.command(Command::ToggleMute)
    }

    /// Append a track without touching playback
    pub fn add_track(&self, track: Track) -> Completion {
        self.command(Command::AddTrack(track))
    }

    /// Stop the worker after the action in flight and release the output
    pub fn shutdown(&self) -> Completion {
        self.command(Command::Shutdown)
    }

    // ===== Observation =====

    /// Latest published state
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that is notified on every published state change
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot.clone()
    }

    /// Stream of playback events
    pub fn events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Whether the worker has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Wait until the published state satisfies `predicate`
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&PlayerSnapshot) -> bool,
    ) -> Result<PlayerSnapshot> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| PlaybackError::ControllerClosed)?;
        Ok(snapshot.clone())
    }

    fn action(&self, action: Action) -> Completion {
        queue::submit(&self.actions, action)
    }

    fn command(&self, command: Command) -> Completion {
        queue::submit(&self.commands, command)
    }
}
