//! Conversation session: the state container for the selected conversation.
//!
//! A session owns the `ChatState` of one conversation at a time, admits at
//! most one submission, and cancels it when the conversation is switched or
//! the session is shut down.

use std::fmt::Display;
use std::future::Future;

use bytes::Bytes;
use futures::Stream;
use scriba_protocol::{ChatRequest, Message};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::driver::{Completion, Driver, Render, StreamUnavailable};
use crate::state::ChatState;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a submission is already in flight")]
    Busy,
    #[error("query is empty")]
    EmptyQuery,
    #[error(transparent)]
    StreamUnavailable(#[from] StreamUnavailable),
}

pub struct Session {
    driver: Driver,
    conversation_id: Option<String>,
    state: ChatState,
    /// Cancelled when the whole session goes away.
    shutdown: CancellationToken,
    /// Token of the in-flight submission, if any.
    in_flight: Option<CancellationToken>,
}

impl Session {
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            conversation_id: None,
            state: ChatState::new(),
            shutdown: CancellationToken::new(),
            in_flight: None,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Token that cancels the in-flight submission and every later one.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Switch to another conversation, discarding the current state.
    pub fn select(&mut self, conversation_id: impl Into<String>) {
        self.cancel();
        self.conversation_id = Some(conversation_id.into());
        self.state = ChatState::new();
    }

    /// Replace the messages with the conversation's stored history.
    pub fn load_history(&mut self, messages: Vec<Message>) {
        self.state.replace_history(messages);
    }

    /// Cancel the in-flight submission, if any.
    ///
    /// A submission whose driver is no longer running is finalized here with
    /// whatever it streamed, so the session accepts the next one.
    pub fn cancel(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        if self.state.is_busy() {
            self.driver.cancelled(&mut self.state, &mut |_: &ChatState| {});
        }
    }

    /// Start a submission: validate the query and append the human message.
    ///
    /// Returns the request to send and the token that cancels this
    /// submission.
    pub fn begin_submission(
        &mut self,
        query: &str,
        renderer: &mut impl Render,
    ) -> Result<(ChatRequest, CancellationToken), SessionError> {
        if self.in_flight.is_some() || self.state.is_busy() {
            return Err(SessionError::Busy);
        }
        let query = query.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyQuery);
        }

        let token = self.shutdown.child_token();
        self.in_flight = Some(token.clone());
        self.driver.submit(&mut self.state, query, renderer);

        let mut request = ChatRequest::new(query);
        if let Some(id) = &self.conversation_id {
            request = request.in_conversation(id.clone());
        }
        Ok((request, token))
    }

    /// Send a query and stream its answer into the state.
    ///
    /// `open` turns the request into a response body; an error from it, or
    /// from the body mid-stream, becomes `SessionError::StreamUnavailable`.
    pub async fn submit<F, Fut, S, OpenError, E>(
        &mut self,
        query: &str,
        open: F,
        renderer: &mut impl Render,
    ) -> Result<Completion, SessionError>
    where
        F: FnOnce(ChatRequest) -> Fut,
        Fut: Future<Output = Result<S, OpenError>>,
        OpenError: Display,
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Display,
    {
        let (request, cancel) = self.begin_submission(query, renderer)?;
        // Settles the session if this future is dropped before it returns
        let mut guard = SubmissionGuard(self);
        let session = &mut *guard.0;

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = open(request) => Some(opened),
        };

        let result = match opened {
            None => Ok(session.driver.cancelled(&mut session.state, renderer)),
            Some(Err(e)) => Err(session.driver.unavailable(&mut session.state, e, renderer)),
            Some(Ok(body)) => {
                session
                    .driver
                    .drive(&mut session.state, body, &cancel, renderer)
                    .await
            }
        };

        session.in_flight = None;
        Ok(result?)
    }
}

struct SubmissionGuard<'a>(&'a mut Session);

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        if self.0.in_flight.is_some() {
            tracing::debug!("submission dropped before completion");
        }
        self.0.cancel();
    }
}
