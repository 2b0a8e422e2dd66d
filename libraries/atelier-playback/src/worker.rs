//! Controller worker task
//!
//! The worker is the only writer of `PlaybackState` and the only owner of the
//! live `AudioOutput`. It takes one queued action at a time and runs it to
//! completion. While an action waits (output readiness, settle delay) the
//! worker keeps servicing immediate commands and output events, but never the
//! next action.

use crate::error::{PlaybackError, Result};
use crate::events::{OutputEvent, PlaybackEvent};
use crate::output::{AudioOutput, OutputEventSender, OutputFactory, OutputSignal};
use crate::playlist::Playlist;
use crate::queue::{Action, Command, Envelope, Reply};
use crate::state::{PlaybackState, Transition};
use crate::types::{PlaybackConfig, PlayerSnapshot, Track};
use crate::volume::Volume;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

/// The output currently bound to a track
struct BoundOutput {
    handle: Box<dyn AudioOutput>,
    generation: u64,
    ready: bool,
}

/// Channel ends shared between the worker and controller handles
pub(crate) struct WorkerChannels {
    pub actions_tx: mpsc::UnboundedSender<Envelope<Action>>,
    pub commands_tx: mpsc::UnboundedSender<Envelope<Command>>,
    pub snapshot_rx: watch::Receiver<PlayerSnapshot>,
    pub events_tx: broadcast::Sender<PlaybackEvent>,
}

/// One thing the worker can react to
enum Input {
    Action(Envelope<Action>),
    Command(Option<Envelope<Command>>),
    Signal(OutputSignal),
    SeekSettled,
    Deadline,
}

pub(crate) struct Worker {
    config: PlaybackConfig,
    playlist: Playlist,
    state: PlaybackState,
    factory: Box<dyn OutputFactory>,
    output: Option<BoundOutput>,
    last_generation: u64,
    autoplay_pending: bool,
    seek_deadline: Option<Instant>,
    closing: bool,
    shutdown_reply: Option<Reply>,

    actions_tx: mpsc::UnboundedSender<Envelope<Action>>,
    actions_rx: mpsc::UnboundedReceiver<Envelope<Action>>,
    commands_rx: mpsc::UnboundedReceiver<Envelope<Command>>,
    signals_tx: mpsc::UnboundedSender<OutputSignal>,
    signals_rx: mpsc::UnboundedReceiver<OutputSignal>,
    snapshot_tx: watch::Sender<PlayerSnapshot>,
    events_tx: broadcast::Sender<PlaybackEvent>,
}

impl Worker {
    /// Spawn the worker on the current tokio runtime
    pub(crate) fn spawn(
        playlist: Playlist,
        factory: Box<dyn OutputFactory>,
        config: PlaybackConfig,
    ) -> WorkerChannels {
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let state = PlaybackState::new(&config);
        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot(&playlist));
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));

        let worker = Worker {
            config,
            playlist,
            state,
            factory,
            output: None,
            last_generation: 0,
            autoplay_pending: false,
            seek_deadline: None,
            closing: false,
            shutdown_reply: None,
            actions_tx: actions_tx.clone(),
            actions_rx,
            commands_rx,
            signals_tx,
            signals_rx,
            snapshot_tx,
            events_tx: events_tx.clone(),
        };
        tokio::spawn(worker.run());

        WorkerChannels {
            actions_tx,
            commands_tx,
            snapshot_rx,
            events_tx,
        }
    }

    async fn run(mut self) {
        debug!(tracks = self.playlist.len(), "Playback worker started");

        while !self.closing {
            match self.next_input(true, None).await {
                Input::Action(envelope) => self.execute(envelope).await,
                input => {
                    self.dispatch(input);
                }
            }
        }

        self.stop();
    }

    /// Wait for the next input
    ///
    /// Queued actions are only accepted when `accept_actions` is set, which
    /// is what keeps actions from overlapping.
    async fn next_input(&mut self, accept_actions: bool, deadline: Option<Instant>) -> Input {
        tokio::select! {
            Some(envelope) = self.actions_rx.recv(), if accept_actions => Input::Action(envelope),
            command = self.commands_rx.recv() => Input::Command(command),
            Some(signal) = self.signals_rx.recv() => Input::Signal(signal),
            () = wait_for(self.seek_deadline) => Input::SeekSettled,
            () = wait_for(deadline) => Input::Deadline,
        }
    }

    /// Handle a non-action input
    ///
    /// Returns the error when an output event failed the current track.
    fn dispatch(&mut self, input: Input) -> Option<PlaybackError> {
        match input {
            Input::Command(Some(envelope)) => self.handle_command(envelope),
            Input::Command(None) => self.closing = true,
            Input::Signal(signal) => return self.handle_signal(signal),
            Input::SeekSettled => self.finish_seek(),
            // Both are consumed by the caller that asked for them
            Input::Action(_) | Input::Deadline => {}
        }
        None
    }

    // ===== Queued actions =====

    async fn execute(&mut self, envelope: Envelope<Action>) {
        let (action, reply) = envelope.into_parts();
        debug!(?action, "Running queued action");

        let result = match action {
            Action::Load { index, autoplay } => self.load_track(index, autoplay).await,
            Action::Play => self.play().await,
            Action::TogglePlay => self.toggle_play().await,
            Action::Next => self.next_track().await,
            Action::Previous => self.previous_track().await,
            Action::Select { index } => self.select_track(index).await,
            Action::AutoAdvance { generation } => self.auto_advance(generation).await,
            Action::SetPlaylist(tracks) => {
                self.set_playlist(tracks);
                Ok(())
            }
        };

        if let Err(err) = &result {
            warn!(error = %err, "Queued action failed");
        }
        reply.send(result);

        self.settle().await;
    }

    /// Let callbacks from a just-retired output drain before the next action
    async fn settle(&mut self) {
        let deadline = Instant::now() + self.config.settle_delay();
        while !self.closing {
            match self.next_input(false, Some(deadline)).await {
                Input::Deadline => break,
                input => {
                    self.dispatch(input);
                }
            }
        }
    }

    async fn load_track(&mut self, index: usize, autoplay: bool) -> Result<()> {
        let uri = self.playlist.track(index)?.source_uri.clone();
        let previous_index = self.state.status().index();

        self.retire_output();
        self.seek_deadline = None;
        self.state.end_seek();
        self.state.apply(Transition::LoadStarted { index });
        self.autoplay_pending = autoplay;

        info!(index, uri = %uri, autoplay, "Loading track");
        self.emit(PlaybackEvent::TrackChanged {
            index,
            previous_index,
        });
        self.emit_status();
        self.publish();

        let bound = self.acquire_output();
        if let Err(err) = bound.handle.load(&uri) {
            return Err(self.fail(err));
        }

        self.wait_until_ready(index).await?;

        let autoplay = std::mem::take(&mut self.autoplay_pending);
        if autoplay && self.state.has_user_interacted() {
            return self.start_playback().await;
        }
        if autoplay {
            debug!(index, "Autoplay suppressed until the first user gesture");
            self.emit(PlaybackEvent::AutoplaySuppressed { index });
        }

        let ready = Transition::Ready {
            duration: self.current_duration(),
            playing: false,
        };
        if self.state.apply(ready) {
            self.emit_status();
        }
        self.publish();
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        self.state.latch_interaction();

        if self.output.is_none() {
            // Nothing bound (first play or after an error): explicit reload
            if self.playlist.is_empty() {
                self.publish();
                return Err(PlaybackError::EmptyPlaylist);
            }
            let index = self.state.current_index();
            return self.load_track(index, true).await;
        }

        if self.state.is_playing() {
            self.publish();
            return Ok(());
        }

        let index = self.state.current_index();
        self.wait_until_ready(index).await?;
        self.start_playback().await
    }

    async fn toggle_play(&mut self) -> Result<()> {
        if self.state.is_loading() {
            return Ok(());
        }
        if self.state.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play().await
        }
    }

    async fn next_track(&mut self) -> Result<()> {
        let index = self.playlist.next_index(self.state.current_index())?;
        let resume = self.state.is_playing();
        self.load_track(index, resume).await
    }

    async fn previous_track(&mut self) -> Result<()> {
        let threshold = self.config.restart_threshold();
        if let Some(bound) = self.output.as_mut() {
            if bound.handle.position() > threshold {
                debug!("Restarting current track");
                bound.handle.set_position(Duration::ZERO);
                self.state.set_elapsed(Duration::ZERO);
                self.publish();
                return Ok(());
            }
        }

        let index = self.playlist.previous_index(self.state.current_index())?;
        let resume = self.state.is_playing();
        self.load_track(index, resume).await
    }

    async fn select_track(&mut self, index: usize) -> Result<()> {
        self.state.latch_interaction();
        self.playlist.track(index)?;

        if index == self.state.current_index() {
            self.toggle_play().await
        } else {
            self.load_track(index, true).await
        }
    }

    async fn auto_advance(&mut self, generation: u64) -> Result<()> {
        if self.output.as_ref().map(|bound| bound.generation) != Some(generation) {
            debug!(generation, "Skipping auto-advance, output already replaced");
            return Ok(());
        }
        let index = self.playlist.next_index(self.state.current_index())?;
        self.load_track(index, true).await
    }

    fn set_playlist(&mut self, tracks: Vec<Track>) {
        self.retire_output();
        self.playlist.replace(tracks);
        self.state.clear_durations();
        self.state.set_current_index(0);
        self.state.apply(Transition::Reset);
        self.seek_deadline = None;

        info!(tracks = self.playlist.len(), "Playlist replaced");
        self.emit_status();
        self.emit(PlaybackEvent::PlaylistChanged {
            length: self.playlist.len(),
        });
        self.publish();
    }

    // ===== Output lifecycle =====

    /// Wait for the bound output to report ready, bounded by the load timeout
    async fn wait_until_ready(&mut self, index: usize) -> Result<()> {
        let timeout = self.config.load_timeout();
        let deadline = Instant::now() + timeout;

        loop {
            match &self.output {
                Some(bound) if bound.ready => return Ok(()),
                Some(_) => {}
                None => return Err(PlaybackError::NoTrackLoaded),
            }
            if self.closing {
                return Err(PlaybackError::ControllerClosed);
            }

            match self.next_input(false, Some(deadline)).await {
                Input::Deadline => {
                    warn!(index, ?timeout, "Track did not become ready in time");
                    return Err(self.fail(PlaybackError::LoadTimeout { index, timeout }));
                }
                input => {
                    if let Some(err) = self.dispatch(input) {
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Ask the output to play, bounded by the load timeout
    ///
    /// Commands that arrive while `play()` is pending wait in their channel
    /// and apply once it settles or times out.
    async fn start_playback(&mut self) -> Result<()> {
        let timeout = self.config.load_timeout();
        let Some(bound) = self.output.as_mut() else {
            return Err(PlaybackError::NoTrackLoaded);
        };

        let outcome = tokio::time::timeout(timeout, bound.handle.play()).await;
        match outcome {
            Ok(Ok(())) => {
                let transition = if self.state.is_loading() {
                    Transition::Ready {
                        duration: self.current_duration(),
                        playing: true,
                    }
                } else {
                    Transition::Started
                };
                if self.state.apply(transition) {
                    self.emit_status();
                }
                self.publish();
                Ok(())
            }
            Ok(Err(err)) => Err(self.fail(PlaybackError::PlayRejected(reason(err)))),
            Err(_) => {
                warn!(?timeout, "Output did not start playing in time");
                let message = format!("play did not start within {timeout:?}");
                Err(self.fail(PlaybackError::PlayRejected(message)))
            }
        }
    }

    fn acquire_output(&mut self) -> &mut BoundOutput {
        self.last_generation += 1;
        let generation = self.last_generation;
        let sender = OutputEventSender::new(generation, self.signals_tx.clone());

        let mut handle = self.factory.create(sender);
        handle.set_volume(self.state.volume().gain());
        trace!(generation, "Acquired output");

        self.output.insert(BoundOutput {
            handle,
            generation,
            ready: false,
        })
    }

    /// Pause, rewind and release the live output
    ///
    /// Events the old output still emits carry a stale generation and are
    /// dropped in `handle_signal`.
    fn retire_output(&mut self) {
        if let Some(mut bound) = self.output.take() {
            debug!(generation = bound.generation, "Retiring output");
            bound.handle.pause();
            bound.handle.set_position(Duration::ZERO);
            bound.handle.release();
        }
    }

    /// Move to `Errored`, release the output and surface the error
    fn fail(&mut self, err: PlaybackError) -> PlaybackError {
        self.retire_output();
        self.autoplay_pending = false;
        self.seek_deadline = None;
        self.state.end_seek();
        self.state.apply(Transition::Failed(err.clone()));

        self.emit(PlaybackEvent::Error {
            index: self.state.status().index(),
            message: err.to_string(),
        });
        self.emit_status();
        self.publish();
        err
    }

    fn handle_signal(&mut self, signal: OutputSignal) -> Option<PlaybackError> {
        let current = self.output.as_ref().map(|bound| bound.generation);
        if current != Some(signal.generation) {
            trace!(
                generation = signal.generation,
                event = ?signal.event,
                "Dropping event from retired output"
            );
            return None;
        }

        match signal.event {
            OutputEvent::Ready { duration } => {
                let duration = duration.or_else(|| self.current_duration());
                if let Some(bound) = self.output.as_mut() {
                    bound.ready = true;
                }
                self.state.set_buffering(false);
                // The status moves when the waiting load action resumes
                if let Some(duration) = duration {
                    let index = self.state.current_index();
                    self.state.record_duration(index, duration);
                }
                self.publish();
            }
            OutputEvent::Buffering => {
                self.state.set_buffering(true);
                self.publish();
            }
            OutputEvent::Playing => {
                self.state.set_buffering(false);
                if self.state.apply(Transition::Started) {
                    self.emit_status();
                }
                self.publish();
            }
            OutputEvent::Paused => {
                if self.state.apply(Transition::Paused) {
                    self.emit_status();
                }
                self.publish();
            }
            OutputEvent::Progress { position } => {
                self.state.set_buffering(false);
                if self.state.observe_position(position) {
                    self.emit(PlaybackEvent::position(position, self.current_duration()));
                    self.publish();
                }
            }
            OutputEvent::Ended => {
                let index = self.state.current_index();
                info!(index, "Track finished");
                if let Some(duration) = self.current_duration() {
                    self.state.set_elapsed(duration);
                }
                if self.state.apply(Transition::Ended) {
                    self.emit_status();
                }
                self.emit(PlaybackEvent::TrackFinished { index });
                self.publish();

                let advance = Envelope::detached(Action::AutoAdvance {
                    generation: signal.generation,
                });
                let _ = self.actions_tx.send(advance);
            }
            OutputEvent::Error { message } => {
                warn!(message = %message, "Output reported an error");
                return Some(self.fail(PlaybackError::Output(message)));
            }
        }
        None
    }

    // ===== Immediate commands =====

    fn handle_command(&mut self, envelope: Envelope<Command>) {
        let (command, reply) = envelope.into_parts();
        trace!(?command, "Applying command");

        let result = match command {
            Command::Pause => {
                self.pause();
                Ok(())
            }
            Command::SeekFraction(fraction) => self.seek_fraction(fraction),
            Command::SeekTo(position) => self.seek_to(position),
            Command::SeekBy(offset_secs) => self.seek_by(offset_secs),
            Command::SetVolume(level) => {
                self.change_volume(|volume| volume.set_level(level));
                Ok(())
            }
            Command::AdjustVolume(delta) => {
                self.change_volume(|volume| volume.adjust(delta));
                Ok(())
            }
            Command::ToggleMute => {
                self.change_volume(Volume::toggle_mute);
                Ok(())
            }
            Command::AddTrack(track) => {
                let index = self.playlist.push(track);
                debug!(index, "Track appended");
                self.emit(PlaybackEvent::PlaylistChanged {
                    length: self.playlist.len(),
                });
                self.publish();
                Ok(())
            }
            Command::Shutdown => {
                self.closing = true;
                self.shutdown_reply = Some(reply);
                return;
            }
        };

        reply.send(result);
    }

    fn pause(&mut self) {
        if self.autoplay_pending {
            debug!("Pending autoplay cancelled by pause");
            self.autoplay_pending = false;
        }
        if !self.state.is_playing() {
            return;
        }

        if let Some(bound) = self.output.as_mut() {
            bound.handle.pause();
        }
        if self.state.apply(Transition::Paused) {
            self.emit_status();
        }
        self.publish();
    }

    fn seek_fraction(&mut self, fraction: f64) -> Result<()> {
        if self.output.is_none() {
            return Err(PlaybackError::NoTrackLoaded);
        }
        let Some(duration) = self.current_duration() else {
            debug!("Seek ignored, duration unknown");
            return Ok(());
        };
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        self.seek_to(duration.mul_f64(fraction))
    }

    fn seek_by(&mut self, offset_secs: f64) -> Result<()> {
        let target = self.state.elapsed().as_secs_f64() + offset_secs;
        let Ok(position) = Duration::try_from_secs_f64(target.max(0.0)) else {
            debug!(offset_secs, "Seek ignored, offset out of range");
            return Ok(());
        };
        self.seek_to(position)
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        let duration = self.current_duration();
        let Some(bound) = self.output.as_mut() else {
            return Err(PlaybackError::NoTrackLoaded);
        };

        let position = duration.map_or(position, |duration| position.min(duration));
        bound.handle.set_position(position);
        self.state.begin_seek(position);
        self.seek_deadline = Some(Instant::now() + self.config.seek_debounce());

        trace!(?position, "Seeking");
        self.emit(PlaybackEvent::position(position, duration));
        self.publish();
        Ok(())
    }

    fn finish_seek(&mut self) {
        self.seek_deadline = None;
        self.state.end_seek();
        self.publish();
    }

    fn change_volume(&mut self, change: impl FnOnce(&mut Volume)) {
        change(self.state.volume_mut());

        let volume = self.state.volume();
        let (gain, level, is_muted) = (volume.gain(), volume.level(), volume.is_muted());
        if let Some(bound) = self.output.as_mut() {
            bound.handle.set_volume(gain);
        }

        self.emit(PlaybackEvent::VolumeChanged { level, is_muted });
        self.publish();
    }

    // ===== Notifications =====

    fn current_duration(&self) -> Option<Duration> {
        self.output
            .as_ref()
            .and_then(|bound| bound.handle.duration())
            .or_else(|| self.state.duration_of(self.state.current_index()))
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(self.state.snapshot(&self.playlist));
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }

    fn emit_status(&self) {
        self.emit(PlaybackEvent::StateChanged {
            status: self.state.status().clone(),
        });
    }

    fn stop(&mut self) {
        self.retire_output();
        self.seek_deadline = None;
        if self.state.apply(Transition::Reset) {
            self.emit_status();
        }
        self.publish();
        info!("Playback worker stopped");

        if let Some(reply) = self.shutdown_reply.take() {
            reply.send(Ok(()));
        }
    }
}

/// Sleep until `deadline`, or forever when there is none
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Message of an output failure without the variant prefix
fn reason(err: PlaybackError) -> String {
    match err {
        PlaybackError::Output(message) | PlaybackError::PlayRejected(message) => message,
        other => other.to_string(),
    }
}
