//! Audio output contract
//!
//! The controller never plays audio itself. It drives one [`AudioOutput`] at a
//! time, created on demand by an [`OutputFactory`] (an HTML audio element
//! bridge, a native stream, or the simulated output in [`crate::sim`]).

use crate::error::Result;
use crate::events::OutputEvent;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// One playable media stream
///
/// Implementors report readiness, progress and failures through the
/// [`OutputEventSender`] they were created with. Commands are fire-and-forget
/// except `play`, which may be rejected.
#[async_trait]
pub trait AudioOutput: Send {
    /// Bind the output to a source URI and start buffering
    ///
    /// Readiness is signalled later with [`OutputEvent::Ready`].
    fn load(&mut self, uri: &str) -> Result<()>;

    /// Start or resume playback
    async fn play(&mut self) -> Result<()>;

    /// Pause playback (no-op when already paused)
    fn pause(&mut self);

    /// Current playback position
    fn position(&self) -> Duration;

    /// Move the playback position
    fn set_position(&mut self, position: Duration);

    /// Track length, once known
    fn duration(&self) -> Option<Duration>;

    /// Set output gain (0.0-1.0)
    fn set_volume(&mut self, gain: f32);

    /// Clear the source and stop emitting events
    ///
    /// Called exactly once before the controller drops the handle.
    fn release(&mut self);
}

/// Creates outputs for the controller
pub trait OutputFactory: Send + Sync {
    fn create(&self, events: OutputEventSender) -> Box<dyn AudioOutput>;
}

impl<F> OutputFactory for F
where
    F: Fn(OutputEventSender) -> Box<dyn AudioOutput> + Send + Sync,
{
    fn create(&self, events: OutputEventSender) -> Box<dyn AudioOutput> {
        self(events)
    }
}

/// Event tagged with the generation of the output that produced it
#[derive(Debug, Clone)]
pub(crate) struct OutputSignal {
    pub generation: u64,
    pub event: OutputEvent,
}

/// Sending half handed to each output
///
/// Every output gets its own generation number. Once the controller retires
/// an output, anything still sent through its sender is discarded.
#[derive(Debug, Clone)]
pub struct OutputEventSender {
    generation: u64,
    tx: UnboundedSender<OutputSignal>,
}

impl OutputEventSender {
    pub(crate) fn new(generation: u64, tx: UnboundedSender<OutputSignal>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the output this sender belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report an event; silently dropped if the controller is gone
    pub fn emit(&self, event: OutputEvent) {
        let _ = self.tx.send(OutputSignal {
            generation: self.generation,
            event,
        });
    }
}
