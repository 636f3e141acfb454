//! Per-call driver for streaming responses.
//!
//! Each call gets two pieces of work:
//!
//! - a transport task that reads the event stream and forwards every item
//!   over a bounded channel;
//! - a single consumer job on the [`IoExecutor`] that drains the channel,
//!   drives the assembler and fires the handler callbacks in order.
//!
//! The consumer job holds its executor slot until the stream ends, so at most
//! `io_pool_size` calls deliver callbacks at a time. A call waiting for a slot
//! stops reading the network once [`EVENT_BUFFER`] events are queued.
//!
//! The call's result is a [`StreamingCall`], a future resolved by the
//! consumer job once the assembler reaches a terminal state.

use super::assembler::StreamAssembler;
use super::sse::{EventStream, StreamEvent};
use crate::error::InferenceError;
use crate::executor::IoExecutor;
use futures_util::StreamExt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Events queued per call before the transport task waits for the consumer.
pub const EVENT_BUFFER: usize = 64;

/// A handle that can be used to request cancellation of a streaming call.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop invoking callbacks and stop reading the response. The network
    /// read in flight is not interrupted instantly.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

/// Result of a streaming call. Dropping it cancels the call.
#[must_use = "a streaming call is cancelled when dropped"]
pub struct StreamingCall<T> {
    result: oneshot::Receiver<Result<T, InferenceError>>,
    cancel: CancelHandle,
}

impl<T> StreamingCall<T> {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl<T> Future for StreamingCall<T> {
    type Output = Result<T, InferenceError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.result).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(if this.cancel.is_cancelled() {
                cancelled()
            } else {
                InferenceError::InternalError("streaming call dropped its result".to_string())
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for StreamingCall<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn cancelled() -> InferenceError {
    InferenceError::Cancelled("streaming call cancelled".to_string())
}

/// Start driving `events` through `assembler`.
pub fn spawn_streaming_call<A>(
    executor: &IoExecutor,
    events: EventStream,
    assembler: A,
) -> StreamingCall<A::Output>
where
    A: StreamAssembler,
{
    let cancel = CancelHandle::new();
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

    let token = cancel.token.clone();
    let transport = tokio::spawn(async move {
        let mut events = events;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                item = events.next() => {
                    let Some(item) = item else { break };
                    let failed = item.is_err();
                    tokio::select! {
                        _ = token.cancelled() => break,
                        sent = event_tx.send(item) => {
                            if sent.is_err() || failed {
                                break;
                            }
                        }
                    }
                }
            }
        }
        tracing::trace!("stream transport finished");
    });

    let (result_tx, result_rx) = oneshot::channel();
    let token = cancel.token.clone();
    let executor = executor.clone();
    tokio::spawn(async move {
        let outcome = executor
            .run(move || consume(assembler, event_rx, token))
            .await
            .and_then(|outcome| outcome);
        transport.abort();
        let _ = result_tx.send(outcome);
    });

    StreamingCall {
        result: result_rx,
        cancel,
    }
}

fn consume<A: StreamAssembler>(
    mut assembler: A,
    mut events: mpsc::Receiver<Result<StreamEvent, InferenceError>>,
    token: CancellationToken,
) -> Result<A::Output, InferenceError> {
    while let Some(item) = events.blocking_recv() {
        if token.is_cancelled() {
            return Err(cancelled());
        }
        let applied = item.and_then(|event| assembler.handle_event(&event));
        if let Err(error) = applied {
            tracing::debug!(error = %error, "streaming call failed");
            return Err(assembler.fail(error));
        }
    }
    if token.is_cancelled() {
        return Err(cancelled());
    }
    tracing::trace!("stream complete");
    assembler.complete()
}
