//! Conversation state and the fold that applies chat events to it.
//!
//! `Reducer` is a pure fold: every operation takes a `ChatState` by value and
//! returns the next one. The stream driver owns the sequencing; nothing here
//! performs I/O.
//!
//! Messages are held behind `Arc` so that an answer delta only replaces the
//! trailing message; every earlier message stays pointer-identical, which
//! lets a renderer skip anything that has not changed.

use std::sync::Arc;

use scriba_protocol::{ChatEvent, Document, Message, Role};

use crate::citation::{cited_positions, mark_referenced};

/// Where the current submission is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No submission in flight.
    #[default]
    Idle,
    /// Query sent, no response bytes yet.
    Sent,
    /// Events arriving.
    Streaming,
    /// Stream ended, trailing frame and citations being settled.
    Finalizing,
}

/// UI state of one conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub messages: Vec<Arc<Message>>,
    pub documents: Vec<Document>,
    pub status: Option<String>,
    /// Set while the server reports that it is generating the answer.
    pub is_generating: bool,
    pub phase: Phase,
    /// Whether the trailing message is the AI message of the current
    /// submission and still receiving deltas.
    answer_open: bool,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the state of a conversation from its stored messages.
    pub fn from_history(messages: Vec<Message>) -> Self {
        let mut state = Self::new();
        state.replace_history(messages);
        state
    }

    /// Replace every message with the loaded history.
    pub fn replace_history(&mut self, messages: Vec<Message>) {
        self.messages = messages.into_iter().map(Arc::new).collect();
        self.answer_open = false;
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Whether any answer text has arrived for the current submission.
    pub fn answer_started(&self) -> bool {
        self.answer_open
    }

    /// The AI message receiving deltas for the current submission.
    pub fn open_answer(&self) -> Option<&Message> {
        if self.answer_open {
            self.messages.last().map(Arc::as_ref)
        } else {
            None
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last().map(Arc::as_ref)
    }
}

/// Settings the fold depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducerOptions {
    /// Status text that means the answer is being generated.
    pub generating_phrase: String,
    /// Status shown when the stream could not be read.
    pub failure_message: String,
}

impl Default for ReducerOptions {
    fn default() -> Self {
        Self {
            generating_phrase: "Generating answer...".to_string(),
            failure_message: "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Applies the events of one submission to a `ChatState`.
#[derive(Debug, Clone, Default)]
pub struct Reducer {
    options: ReducerOptions,
}

impl Reducer {
    pub fn new(options: ReducerOptions) -> Self {
        Self { options }
    }

    /// Append the human message and mark the submission as sent.
    pub fn submit(&self, mut state: ChatState, query: &str) -> ChatState {
        state.messages.push(Arc::new(Message::human(query)));
        state.answer_open = false;
        state.phase = Phase::Sent;
        state
    }

    /// Apply one decoded event.
    pub fn apply(&self, mut state: ChatState, event: ChatEvent) -> ChatState {
        if state.phase == Phase::Sent {
            state.phase = Phase::Streaming;
        }

        match event {
            ChatEvent::Status(text) => {
                // Only finalization or failure clears the flag
                if text == self.options.generating_phrase {
                    state.is_generating = true;
                }
                state.status = Some(text);
            }
            ChatEvent::Docs(mut documents) => {
                for doc in &mut documents {
                    doc.is_referenced = false;
                }
                state.documents = documents;
            }
            ChatEvent::Answer(delta) => {
                if !state.answer_open {
                    state.messages.push(Arc::new(Message::ai(String::new())));
                    state.answer_open = true;
                }
                if let Some(last) = state.messages.last_mut() {
                    Arc::make_mut(last).content.push_str(&delta);
                }
            }
            ChatEvent::Other { name } => {
                tracing::debug!(event = %name, "ignoring unknown event");
            }
        }

        state
    }

    /// Close the submission: settle citations, clear the transient status.
    pub fn finish(&self, mut state: ChatState) -> ChatState {
        state.phase = Phase::Finalizing;

        let answer = state
            .open_answer()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        mark_referenced(&mut state.documents, &answer);
        if let Some(&highest) = cited_positions(&answer).last() {
            if highest > state.documents.len() {
                tracing::warn!(
                    cited = highest,
                    documents = state.documents.len(),
                    "answer cites a document that was never sent"
                );
            }
        }

        state.status = None;
        state.is_generating = false;
        state.answer_open = false;
        state.phase = Phase::Idle;
        state
    }

    /// Abandon the submission after a transport failure.
    ///
    /// If no answer text arrived, the human message is removed again and its
    /// text returned so the caller can put it back into the input.
    pub fn fail(&self, mut state: ChatState) -> (ChatState, Option<String>) {
        let mut restored = None;
        if !state.answer_started() {
            let pending = state
                .messages
                .last()
                .is_some_and(|m| m.role == Role::Human);
            if pending {
                restored = state.messages.pop().map(|m| m.content.clone());
            }
        }

        state.status = Some(self.options.failure_message.clone());
        state.is_generating = false;
        state.answer_open = false;
        state.phase = Phase::Idle;
        (state, restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> ChatEvent {
        ChatEvent::Answer(text.to_string())
    }

    fn status(text: &str) -> ChatEvent {
        ChatEvent::Status(text.to_string())
    }

    fn submitted(reducer: &Reducer) -> ChatState {
        reducer.submit(ChatState::new(), "what is a proof?")
    }

    #[test]
    fn submit_appends_human_message() {
        let reducer = Reducer::default();
        let state = submitted(&reducer);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(*state.messages[0], Message::human("what is a proof?"));
        assert_eq!(state.phase, Phase::Sent);
        assert!(state.is_busy());
    }

    #[test]
    fn status_replaces_and_tracks_generating() {
        let reducer = Reducer::default();
        let state = reducer.apply(submitted(&reducer), status("Searching"));
        assert_eq!(state.status.as_deref(), Some("Searching"));
        assert!(!state.is_generating);
        assert_eq!(state.phase, Phase::Streaming);

        let state = reducer.apply(state, status("Generating answer..."));
        assert!(state.is_generating);

        let state = reducer.apply(state, status("Checking citations"));
        assert!(state.is_generating);
        assert_eq!(state.status.as_deref(), Some("Checking citations"));

        let state = reducer.finish(state);
        assert!(!state.is_generating);
    }

    #[test]
    fn custom_generating_phrase() {
        let reducer = Reducer::new(ReducerOptions {
            generating_phrase: "Writing".to_string(),
            ..ReducerOptions::default()
        });
        let state = reducer.apply(submitted(&reducer), status("Generating answer..."));
        assert!(!state.is_generating);
        let state = reducer.apply(state, status("Writing"));
        assert!(state.is_generating);
        let state = reducer.apply(state, status("Generating answer..."));
        assert!(state.is_generating);

        let (state, _) = reducer.fail(state);
        assert!(!state.is_generating);
    }

    #[test]
    fn docs_replace_never_merge() {
        let reducer = Reducer::default();
        let mut flagged = Document::new("stale", 0.1);
        flagged.is_referenced = true;

        let state = reducer.apply(
            submitted(&reducer),
            ChatEvent::Docs(vec![Document::new("a", 0.9), Document::new("b", 0.8)]),
        );
        let state = reducer.apply(state, ChatEvent::Docs(vec![flagged]));

        assert_eq!(state.documents.len(), 1);
        assert_eq!(state.documents[0].title, "stale");
        assert!(!state.documents[0].is_referenced);
    }

    #[test]
    fn answers_append_to_one_message() {
        let reducer = Reducer::default();
        let mut state = submitted(&reducer);
        for delta in ["Hel", "lo", " world"] {
            state = reducer.apply(state, answer(delta));
        }

        assert_eq!(state.messages.len(), 2);
        assert_eq!(*state.messages[1], Message::ai("Hello world"));
        assert_eq!(state.open_answer().map(|m| m.content.as_str()), Some("Hello world"));
    }

    #[test]
    fn answer_leaves_earlier_messages_untouched() {
        let reducer = Reducer::default();
        let history = ChatState::from_history(vec![Message::human("q1"), Message::ai("a1")]);
        let state = reducer.submit(history, "q2");
        let state = reducer.apply(state, answer("a"));
        let before: Vec<Arc<Message>> = state.messages.clone();

        let state = reducer.apply(state, answer("b"));
        for i in 0..3 {
            assert!(Arc::ptr_eq(&before[i], &state.messages[i]));
        }
        assert_eq!(state.messages[3].content, "ab");
    }

    #[test]
    fn unknown_event_is_ignored() {
        let reducer = Reducer::default();
        let state = reducer.apply(submitted(&reducer), status("Searching"));
        let next = reducer.apply(
            state.clone(),
            ChatEvent::Other {
                name: "usage".to_string(),
            },
        );
        assert_eq!(next, state);
    }

    #[test]
    fn finish_marks_cited_documents() {
        let reducer = Reducer::default();
        let state = reducer.apply(
            submitted(&reducer),
            ChatEvent::Docs(vec![Document::new("one", 0.9), Document::new("two", 0.8)]),
        );
        let state = reducer.apply(state, status("Generating answer..."));
        let state = reducer.apply(state, answer("Shown in [^2]."));
        let state = reducer.finish(state);

        assert!(!state.documents[0].is_referenced);
        assert!(state.documents[1].is_referenced);
        assert_eq!(state.status, None);
        assert!(!state.is_generating);
        assert_eq!(state.phase, Phase::Idle);
        assert!(!state.answer_started());
    }

    #[test]
    fn finish_ignores_citations_in_older_answers() {
        let reducer = Reducer::default();
        let history = ChatState::from_history(vec![Message::human("q"), Message::ai("see [^1]")]);
        let state = reducer.submit(history, "q2");
        let state = reducer.apply(state, ChatEvent::Docs(vec![Document::new("one", 0.9)]));
        let state = reducer.finish(state);
        assert!(!state.documents[0].is_referenced);
    }

    #[test]
    fn next_submission_opens_new_answer() {
        let reducer = Reducer::default();
        let state = reducer.apply(submitted(&reducer), answer("first"));
        let state = reducer.finish(state);
        let state = reducer.submit(state, "again");
        let state = reducer.apply(state, answer("second"));

        let contents: Vec<&str> = state.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["what is a proof?", "first", "again", "second"]);
    }

    #[test]
    fn fail_before_answer_restores_input() {
        let reducer = Reducer::default();
        let history = ChatState::from_history(vec![Message::human("q1"), Message::ai("a1")]);
        let state = reducer.submit(history, "q2");
        let state = reducer.apply(state, status("Searching"));

        let (state, restored) = reducer.fail(state);
        assert_eq!(restored.as_deref(), Some("q2"));
        assert_eq!(state.messages.len(), 2);
        assert_eq!(
            state.status.as_deref(),
            Some("Something went wrong. Please try again.")
        );
        assert_eq!(state.phase, Phase::Idle);
    }

    #[test]
    fn fail_after_answer_keeps_exchange() {
        let reducer = Reducer::default();
        let state = reducer.apply(submitted(&reducer), answer("partial"));
        let (state, restored) = reducer.fail(state);
        assert_eq!(restored, None);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].content, "partial");
        assert!(!state.is_generating);
    }

    #[test]
    fn replace_history_resets_open_answer() {
        let reducer = Reducer::default();
        let mut state = reducer.apply(submitted(&reducer), answer("x"));
        state.replace_history(vec![Message::human("loaded")]);
        assert_eq!(state.messages.len(), 1);
        assert!(state.open_answer().is_none());
    }
}
