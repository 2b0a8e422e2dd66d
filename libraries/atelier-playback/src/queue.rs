//! Action queue plumbing
//!
//! Transport actions travel through one FIFO channel to the controller worker,
//! which runs them strictly one at a time. Immediate commands (pause, seek,
//! volume) use a second channel the worker keeps draining while an action is
//! waiting on the output.
//!
//! Submissions are sent when the controller method is *called*, not when the
//! returned [`Completion`] is first polled, so call order is execution order.

use crate::error::{PlaybackError, Result};
use crate::types::Track;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Serialized transport actions
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    Load { index: usize, autoplay: bool },
    Play,
    TogglePlay,
    Next,
    Previous,
    Select { index: usize },
    /// Output `generation` ended; advance unless it was already replaced
    AutoAdvance { generation: u64 },
    SetPlaylist(Vec<Track>),
}

/// Commands applied as soon as the worker sees them
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Pause,
    SeekFraction(f64),
    SeekTo(Duration),
    SeekBy(f64),
    SetVolume(u8),
    AdjustVolume(i16),
    ToggleMute,
    AddTrack(Track),
    Shutdown,
}

/// A submission plus the channel its outcome is reported on
#[derive(Debug)]
pub(crate) struct Envelope<T> {
    pub op: T,
    pub reply: Reply,
}

impl<T> Envelope<T> {
    /// Submission nobody waits on (internal auto-advance)
    pub fn detached(op: T) -> Self {
        Self {
            op,
            reply: Reply(None),
        }
    }

    pub fn into_parts(self) -> (T, Reply) {
        (self.op, self.reply)
    }
}

/// Reporting half of a submission
#[derive(Debug)]
pub(crate) struct Reply(Option<oneshot::Sender<Result<()>>>);

impl Reply {
    /// Report the outcome; the submitter may have stopped listening
    pub fn send(self, result: Result<()>) {
        if let Some(tx) = self.0 {
            let _ = tx.send(result);
        }
    }
}

/// Send `op` and return the future for its outcome
pub(crate) fn submit<T>(tx: &mpsc::UnboundedSender<Envelope<T>>, op: T) -> Completion {
    let (reply, rx) = oneshot::channel();
    match tx.send(Envelope {
        op,
        reply: Reply(Some(reply)),
    }) {
        Ok(()) => Completion::pending(rx),
        Err(_) => Completion::ready(Err(PlaybackError::ControllerClosed)),
    }
}

/// Outcome of a submitted action or command
///
/// Dropping a `Completion` does not cancel the operation; it only discards the
/// result.
#[must_use = "the outcome of a playback operation is only observed by awaiting it"]
#[derive(Debug)]
pub struct Completion {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    Pending(oneshot::Receiver<Result<()>>),
    Ready(Option<Result<()>>),
}

impl Completion {
    fn pending(rx: oneshot::Receiver<Result<()>>) -> Self {
        Self {
            inner: Inner::Pending(rx),
        }
    }

    pub(crate) fn ready(result: Result<()>) -> Self {
        Self {
            inner: Inner::Ready(Some(result)),
        }
    }
}

impl Future for Completion {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.inner {
            Inner::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|outcome| outcome.unwrap_or(Err(PlaybackError::ControllerClosed))),
            Inner::Ready(result) => Poll::Ready(result.take().unwrap_or(Ok(()))),
        }
    }
}
