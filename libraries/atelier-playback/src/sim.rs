//! Simulated audio output
//!
//! A clock-driven stand-in for a real media element. It never decodes
//! anything: it waits `ready_after`, then reports progress on the tokio clock
//! until the configured length is reached. Per-URI profiles make it possible
//! to script slow, broken or never-ready sources.
//!
//! Runs on the tokio clock, so tests with a paused runtime drive it
//! deterministically.

use crate::error::{PlaybackError, Result};
use crate::events::OutputEvent;
use crate::output::{AudioOutput, OutputEventSender, OutputFactory};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Behavior of a simulated source
#[derive(Debug, Clone, PartialEq)]
pub struct SimProfile {
    /// Delay before the source reports ready; `None` never becomes ready
    pub ready_after: Option<Duration>,

    /// Track length; `None` reports an unknown duration and never ends
    pub length: Option<Duration>,

    /// Report this error instead of becoming ready
    pub load_error: Option<String>,

    /// Reject every play command with this reason
    pub reject_play: Option<String>,

    /// Interval between progress reports
    pub tick: Duration,
}

impl SimProfile {
    pub fn ready_after(mut self, delay: Duration) -> Self {
        self.ready_after = Some(delay);
        self
    }

    pub fn never_ready(mut self) -> Self {
        self.ready_after = None;
        self
    }

    pub fn length(mut self, length: Duration) -> Self {
        self.length = Some(length);
        self
    }

    pub fn unknown_length(mut self) -> Self {
        self.length = None;
        self
    }

    pub fn fail_load(mut self, message: impl Into<String>) -> Self {
        self.load_error = Some(message.into());
        self
    }

    pub fn reject_play(mut self, reason: impl Into<String>) -> Self {
        self.reject_play = Some(reason.into());
        self
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

impl Default for SimProfile {
    fn default() -> Self {
        Self {
            ready_after: Some(Duration::from_millis(20)),
            length: Some(Duration::from_secs(180)),
            load_error: None,
            reject_play: None,
            tick: Duration::from_millis(250),
        }
    }
}

/// Counters shared by every output of one factory
#[derive(Debug, Default)]
pub struct OutputStats {
    created: AtomicUsize,
    live: AtomicUsize,
    peak_live: AtomicUsize,
    plays: AtomicUsize,
    last_gain: AtomicU32,
}

impl OutputStats {
    /// Outputs created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Outputs created and not yet released
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live outputs
    pub fn peak_live(&self) -> usize {
        self.peak_live.load(Ordering::SeqCst)
    }

    /// Accepted play commands
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    /// Gain most recently applied to any output
    pub fn last_gain(&self) -> f32 {
        f32::from_bits(self.last_gain.load(Ordering::SeqCst))
    }

    fn output_created(&self) {
        self.created.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_live.fetch_max(live, Ordering::SeqCst);
    }

    fn output_released(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Factory for [`SimulatedOutput`]s
#[derive(Debug, Clone, Default)]
pub struct SimulatedOutputFactory {
    default_profile: SimProfile,
    profiles: Arc<HashMap<String, SimProfile>>,
    stats: Arc<OutputStats>,
    latest: Arc<Mutex<Option<Attached>>>,
}

/// Handles of the most recently created output
#[derive(Debug)]
struct Attached {
    core: Arc<Mutex<SimCore>>,
    events: OutputEventSender,
}

impl SimulatedOutputFactory {
    /// Factory whose sources all behave like `default_profile`
    pub fn new(default_profile: SimProfile) -> Self {
        Self {
            default_profile,
            ..Self::default()
        }
    }

    /// Use `profile` for sources loaded from `uri`
    pub fn with_profile(mut self, uri: impl Into<String>, profile: SimProfile) -> Self {
        Arc::make_mut(&mut self.profiles).insert(uri.into(), profile);
        self
    }

    pub fn stats(&self) -> Arc<OutputStats> {
        Arc::clone(&self.stats)
    }

    /// Raise `event` on the newest output as if the media element fired it
    /// on its own (a stall, an OS media key, a dropped stream)
    ///
    /// `Paused`, `Ended` and `Error` also stop the simulated clock. Returns
    /// false when that output is already released.
    pub fn inject(&self, event: OutputEvent) -> bool {
        let latest = lock(&self.latest);
        let Some(attached) = latest.as_ref() else {
            return false;
        };

        {
            let mut core = lock(&attached.core);
            if core.released {
                return false;
            }
            if matches!(
                event,
                OutputEvent::Paused | OutputEvent::Ended | OutputEvent::Error { .. }
            ) {
                core.halt();
            }
        }
        attached.events.emit(event);
        true
    }
}

impl OutputFactory for SimulatedOutputFactory {
    fn create(&self, events: OutputEventSender) -> Box<dyn AudioOutput> {
        self.stats.output_created();
        let core = Arc::new(Mutex::new(SimCore::new(self.default_profile.clone())));
        *lock(&self.latest) = Some(Attached {
            core: Arc::clone(&core),
            events: events.clone(),
        });

        Box::new(SimulatedOutput {
            core,
            events,
            default_profile: self.default_profile.clone(),
            profiles: Arc::clone(&self.profiles),
            stats: Arc::clone(&self.stats),
        })
    }
}

/// State shared with the ready and clock tasks
#[derive(Debug)]
struct SimCore {
    profile: SimProfile,
    /// Bumped by every load; stale ready tasks compare against it
    load_epoch: u64,
    /// Bumped whenever the clock must stop
    run_epoch: u64,
    ready: bool,
    playing: bool,
    released: bool,
    base: Duration,
    started_at: Option<Instant>,
}

impl SimCore {
    fn new(profile: SimProfile) -> Self {
        Self {
            profile,
            load_epoch: 0,
            run_epoch: 0,
            ready: false,
            playing: false,
            released: false,
            base: Duration::ZERO,
            started_at: None,
        }
    }

    fn position(&self) -> Duration {
        let position = match self.started_at {
            Some(started_at) => self.base + started_at.elapsed(),
            None => self.base,
        };
        self.profile
            .length
            .map_or(position, |length| position.min(length))
    }

    /// Freeze the clock at the current position
    fn halt(&mut self) {
        self.base = self.position();
        self.started_at = None;
        self.playing = false;
        self.run_epoch += 1;
    }
}

/// Simulated media element
#[derive(Debug)]
pub struct SimulatedOutput {
    core: Arc<Mutex<SimCore>>,
    events: OutputEventSender,
    default_profile: SimProfile,
    profiles: Arc<HashMap<String, SimProfile>>,
    stats: Arc<OutputStats>,
}

#[async_trait]
impl AudioOutput for SimulatedOutput {
    fn load(&mut self, uri: &str) -> Result<()> {
        let profile = self
            .profiles
            .get(uri)
            .unwrap_or(&self.default_profile)
            .clone();

        let epoch = {
            let mut core = lock(&self.core);
            if core.released {
                return Err(PlaybackError::Output("output already released".to_string()));
            }
            core.halt();
            core.base = Duration::ZERO;
            core.ready = false;
            core.profile = profile.clone();
            core.load_epoch += 1;
            core.load_epoch
        };
        tracing::trace!(uri, generation = self.events.generation(), "Simulated load");

        let Some(delay) = profile.ready_after else {
            return Ok(());
        };
        let core = Arc::clone(&self.core);
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let event = {
                let mut core = lock(&core);
                if core.released || core.load_epoch != epoch {
                    return;
                }
                match profile.load_error {
                    Some(message) => OutputEvent::Error { message },
                    None => {
                        core.ready = true;
                        OutputEvent::Ready {
                            duration: profile.length,
                        }
                    }
                }
            };
            events.emit(event);
        });
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        let run = {
            let mut core = lock(&self.core);
            if core.released {
                return Err(PlaybackError::Output("output already released".to_string()));
            }
            if !core.ready {
                return Err(PlaybackError::PlayRejected("source not ready".to_string()));
            }
            if let Some(reason) = &core.profile.reject_play {
                return Err(PlaybackError::PlayRejected(reason.clone()));
            }
            if core.playing {
                return Ok(());
            }
            core.playing = true;
            core.started_at = Some(Instant::now());
            core.run_epoch += 1;
            core.run_epoch
        };

        self.stats.plays.fetch_add(1, Ordering::SeqCst);
        self.events.emit(OutputEvent::Playing);
        tokio::spawn(run_clock(Arc::clone(&self.core), self.events.clone(), run));
        Ok(())
    }

    fn pause(&mut self) {
        let was_playing = {
            let mut core = lock(&self.core);
            let was_playing = core.playing;
            if was_playing {
                core.halt();
            }
            was_playing
        };
        if was_playing {
            self.events.emit(OutputEvent::Paused);
        }
    }

    fn position(&self) -> Duration {
        lock(&self.core).position()
    }

    fn set_position(&mut self, position: Duration) {
        let mut core = lock(&self.core);
        core.base = core
            .profile
            .length
            .map_or(position, |length| position.min(length));
        if core.playing {
            core.started_at = Some(Instant::now());
        }
    }

    fn duration(&self) -> Option<Duration> {
        let core = lock(&self.core);
        if core.ready {
            core.profile.length
        } else {
            None
        }
    }

    fn set_volume(&mut self, gain: f32) {
        self.stats
            .last_gain
            .store(gain.clamp(0.0, 1.0).to_bits(), Ordering::SeqCst);
    }

    fn release(&mut self) {
        let mut core = lock(&self.core);
        if core.released {
            return;
        }
        core.halt();
        core.released = true;
        core.ready = false;
        core.base = Duration::ZERO;
        self.stats.output_released();
    }
}

impl Drop for SimulatedOutput {
    fn drop(&mut self) {
        self.release();
    }
}

/// Report progress while playing and signal the end of the track
async fn run_clock(core: Arc<Mutex<SimCore>>, events: OutputEventSender, run: u64) {
    let tick = lock(&core).profile.tick.max(Duration::from_millis(1));
    let mut interval = tokio::time::interval(tick);
    interval.tick().await;

    loop {
        interval.tick().await;
        let (position, ended) = {
            let mut core = lock(&core);
            if core.released || core.run_epoch != run {
                return;
            }
            let position = core.position();
            let ended = core.profile.length.is_some_and(|length| position >= length);
            if ended {
                core.halt();
            }
            (position, ended)
        };

        events.emit(OutputEvent::Progress { position });
        if ended {
            events.emit(OutputEvent::Ended);
            return;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputSignal;
    use tokio::sync::mpsc;

    fn output(
        factory: &SimulatedOutputFactory,
    ) -> (Box<dyn AudioOutput>, mpsc::UnboundedReceiver<OutputSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (factory.create(OutputEventSender::new(1, tx)), rx)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<OutputSignal>) -> OutputEvent {
        rx.recv().await.unwrap().event
    }

    #[tokio::test(start_paused = true)]
    async fn becomes_ready_after_delay() {
        let factory = SimulatedOutputFactory::new(
            SimProfile::default()
                .ready_after(Duration::from_millis(500))
                .length(Duration::from_secs(90)),
        );
        let (mut output, mut rx) = output(&factory);

        output.load("a.mp3").unwrap();
        assert_eq!(output.duration(), None);

        assert_eq!(
            next_event(&mut rx).await,
            OutputEvent::Ready {
                duration: Some(Duration::from_secs(90))
            }
        );
        assert_eq!(output.duration(), Some(Duration::from_secs(90)));
    }

    #[tokio::test(start_paused = true)]
    async fn plays_to_the_end() {
        let factory = SimulatedOutputFactory::new(
            SimProfile::default()
                .length(Duration::from_secs(1))
                .tick(Duration::from_millis(500)),
        );
        let (mut output, mut rx) = output(&factory);
        output.load("a.mp3").unwrap();
        next_event(&mut rx).await;

        output.play().await.unwrap();
        assert_eq!(next_event(&mut rx).await, OutputEvent::Playing);
        assert_eq!(
            next_event(&mut rx).await,
            OutputEvent::Progress {
                position: Duration::from_millis(500)
            }
        );
        assert_eq!(
            next_event(&mut rx).await,
            OutputEvent::Progress {
                position: Duration::from_secs(1)
            }
        );
        assert_eq!(next_event(&mut rx).await, OutputEvent::Ended);
        assert_eq!(factory.stats().plays(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn profiles_are_matched_by_uri() {
        let factory = SimulatedOutputFactory::default()
            .with_profile("broken.mp3", SimProfile::default().fail_load("404"));
        let (mut output, mut rx) = output(&factory);

        output.load("broken.mp3").unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            OutputEvent::Error {
                message: "404".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn play_before_ready_is_rejected() {
        let factory = SimulatedOutputFactory::new(SimProfile::default().never_ready());
        let (mut output, _rx) = output(&factory);
        output.load("a.mp3").unwrap();

        assert!(matches!(
            output.play().await,
            Err(PlaybackError::PlayRejected(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn release_silences_output_and_updates_stats() {
        let factory = SimulatedOutputFactory::default();
        let stats = factory.stats();
        let (mut output, mut rx) = output(&factory);
        assert_eq!(stats.live(), 1);

        output.load("a.mp3").unwrap();
        output.release();
        output.release();
        assert_eq!(stats.live(), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());

        drop(output);
        assert_eq!(stats.live(), 0);
        assert_eq!(stats.peak_live(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn injected_pause_stops_the_clock() {
        let factory = SimulatedOutputFactory::default();
        assert!(!factory.inject(OutputEvent::Buffering));

        let (mut output, mut rx) = output(&factory);
        output.load("a.mp3").unwrap();
        next_event(&mut rx).await;
        output.play().await.unwrap();
        assert_eq!(next_event(&mut rx).await, OutputEvent::Playing);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(factory.inject(OutputEvent::Paused));
        assert_eq!(next_event(&mut rx).await, OutputEvent::Paused);

        let frozen = output.position();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(output.position(), frozen);
        assert!(rx.try_recv().is_err());

        output.release();
        assert!(!factory.inject(OutputEvent::Buffering));
    }

    #[tokio::test(start_paused = true)]
    async fn seek_moves_clock() {
        let factory = SimulatedOutputFactory::default();
        let (mut output, mut rx) = output(&factory);
        output.load("a.mp3").unwrap();
        next_event(&mut rx).await;

        output.set_position(Duration::from_secs(400));
        assert_eq!(output.position(), Duration::from_secs(180));

        output.set_position(Duration::from_secs(42));
        assert_eq!(output.position(), Duration::from_secs(42));
    }
}
