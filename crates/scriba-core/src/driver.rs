//! The stream driver: reads one submission's response body and folds it
//! into the conversation state.
//!
//! Suspension points are explicit: awaiting the next chunk from the
//! transport, and one `yield_now` after every applied frame so a burst of
//! frames cannot starve whatever renders the state. Cancellation is checked
//! at both points.

use std::fmt::Display;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use scriba_client::{decode_frame_text, FrameBuffer};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::state::{ChatState, Phase, Reducer};

/// Receives the state after every change worth showing.
pub trait Render {
    fn render(&mut self, state: &ChatState);
}

impl<F: FnMut(&ChatState)> Render for F {
    fn render(&mut self, state: &ChatState) {
        self(state)
    }
}

/// How a submission that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The server closed the stream.
    Completed,
    /// The submission was cancelled; whatever streamed so far is kept.
    Cancelled,
}

/// The response stream could not be opened or broke off.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stream unavailable: {reason}")]
pub struct StreamUnavailable {
    pub reason: String,
    /// The query text, when it was taken back out of the conversation.
    pub restored_input: Option<String>,
}

/// Runs submissions through a `Reducer`.
#[derive(Debug, Clone)]
pub struct Driver {
    reducer: Reducer,
    yield_per_frame: bool,
}

impl Driver {
    pub fn new(reducer: Reducer) -> Self {
        Self {
            reducer,
            yield_per_frame: true,
        }
    }

    pub fn with_yield_per_frame(mut self, enabled: bool) -> Self {
        self.yield_per_frame = enabled;
        self
    }

    /// Append the human message for a new submission.
    pub fn submit(&self, state: &mut ChatState, query: &str, renderer: &mut impl Render) {
        *state = self.reducer.submit(std::mem::take(state), query);
        renderer.render(state);
    }

    /// Consume `body` until it ends, fails, or `cancel` fires.
    pub async fn drive<S, E>(
        &self,
        state: &mut ChatState,
        mut body: S,
        cancel: &CancellationToken,
        renderer: &mut impl Render,
    ) -> Result<Completion, StreamUnavailable>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Display,
    {
        let mut buffer = FrameBuffer::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled(state, renderer)),
                next = body.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    if state.phase == Phase::Sent {
                        state.phase = Phase::Streaming;
                    }
                    for text in buffer.push(&chunk) {
                        self.apply_frame(state, &text, renderer);
                        if self.yield_per_frame {
                            tokio::task::yield_now().await;
                        }
                        if cancel.is_cancelled() {
                            return Ok(self.cancelled(state, renderer));
                        }
                    }
                }
                Some(Err(e)) => return Err(self.unavailable(state, e, renderer)),
                None => break,
            }
        }

        state.phase = Phase::Finalizing;
        if let Some(text) = buffer.finish() {
            tracing::debug!("applying trailing partial frame");
            self.apply_frame(state, &text, renderer);
        }
        self.finish(state, renderer);
        Ok(Completion::Completed)
    }

    /// Record a failure to open or read the stream.
    pub fn unavailable(
        &self,
        state: &mut ChatState,
        reason: impl Display,
        renderer: &mut impl Render,
    ) -> StreamUnavailable {
        let reason = reason.to_string();
        tracing::error!("chat stream failed: {reason}");

        let (next, restored_input) = self.reducer.fail(std::mem::take(state));
        *state = next;
        renderer.render(state);
        StreamUnavailable {
            reason,
            restored_input,
        }
    }

    /// Close a submission cancelled before the stream ended.
    pub fn cancelled(&self, state: &mut ChatState, renderer: &mut impl Render) -> Completion {
        tracing::info!("submission cancelled");
        self.finish(state, renderer);
        Completion::Cancelled
    }

    fn finish(&self, state: &mut ChatState, renderer: &mut impl Render) {
        *state = self.reducer.finish(std::mem::take(state));
        renderer.render(state);
    }

    fn apply_frame(&self, state: &mut ChatState, text: &str, renderer: &mut impl Render) {
        if let Some(event) = decode_frame_text(text) {
            *state = self.reducer.apply(std::mem::take(state), event);
            renderer.render(state);
        }
    }
}
