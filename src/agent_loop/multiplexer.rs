//! Streaming multiplexer: converts a run's internal event callbacks into an
//! ordered, single-pass event sequence.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use super::events::{RunErrorKind, RunEvent, RunEventSink, StreamEvent};
use super::types::RunId;

/// Ordered, finite, single-pass sequence of run events.
///
/// The sequence ends after the terminal event (`RunComplete` or a
/// terminating `RunError`). Dropping the stream early signals the underlying
/// run to cancel cooperatively at its next suspension point; state reached
/// after the signal is never checkpointed.
pub struct RunStream {
    run_id: RunId,
    events: UnboundedReceiverStream<RunEvent>,
    cancel_token: CancellationToken,
    finished: bool,
}

impl RunStream {
    pub(crate) fn new(
        run_id: RunId,
        rx: mpsc::UnboundedReceiver<RunEvent>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            run_id,
            events: UnboundedReceiverStream::new(rx),
            cancel_token,
            finished: false,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Cancel the underlying run without waiting for the stream to drop.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

impl Stream for RunStream {
    type Item = RunEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match Pin::new(&mut self.events).poll_next(cx) {
            Poll::Ready(Some(event)) => {
                if is_terminal(&event.payload) {
                    self.finished = true;
                }
                Poll::Ready(Some(event))
            }
            other => other,
        }
    }
}

impl Drop for RunStream {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// `Checkpoint` errors are reported mid-stream; every other `RunError` kind
/// closes the sequence.
fn is_terminal(event: &StreamEvent) -> bool {
    match event {
        StreamEvent::RunComplete => true,
        StreamEvent::RunError { kind, .. } => *kind != RunErrorKind::Checkpoint,
        _ => false,
    }
}

/// Event sink backed by a channel, paired with its receiving end. Emission
/// order is preserved; the channel closes when the run task finishes.
pub(crate) fn channel_sink() -> (RunEventSink, mpsc::UnboundedReceiver<RunEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink: RunEventSink = Arc::new(move |event| {
        let _ = tx.send(event);
    });
    (sink, rx)
}
