//! The commands behind the `scriba` binary.
//!
//! Each command builds its client and session from the loaded `Config`, runs
//! to completion on the caller's runtime, and reports failures as
//! `CommandError` so `main` can choose the exit code.

use std::io::{self, Write};

use futures::StreamExt;
use scriba_client::{decode_events, ChatClient, ClientError};
use scriba_protocol::{ChatEvent, ChatRequest};
use thiserror::Error;

use crate::config::Config;
use crate::driver::{Completion, Driver};
use crate::output::{format_document, TerminalView};
use crate::session::{Session, SessionError};
use crate::state::Reducer;
use crate::style::Style;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl CommandError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Session(SessionError::EmptyQuery) => 2,
            _ => 1,
        }
    }
}

/// Exit code of a cancelled submission (as for SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

fn build_client(config: &Config) -> Result<ChatClient, CommandError> {
    Ok(ChatClient::new(config.server.client_config()?)?)
}

fn build_session(config: &Config) -> Session {
    let reducer = Reducer::new(config.chat.reducer_options());
    let driver = Driver::new(reducer).with_yield_per_frame(config.chat.yield_per_frame);
    Session::new(driver)
}

/// Ask one question and stream the answer to the terminal.
///
/// Returns the process exit code on success or cancellation.
pub async fn run_ask(
    config: &Config,
    question: &str,
    conversation_id: Option<&str>,
    is_tty: bool,
) -> Result<i32, CommandError> {
    let client = build_client(config)?;
    let mut session = build_session(config);
    if let Some(id) = conversation_id {
        session.select(id);
    }

    let shutdown = session.shutdown_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let mut view = TerminalView::new(io::stdout(), io::stderr(), Style::new(), is_tty);
    let result = session
        .submit(
            question,
            |request| {
                let client = &client;
                async move { client.open_stream(&request).await }
            },
            &mut view,
        )
        .await;
    interrupt.abort();

    match result {
        Ok(Completion::Completed) => Ok(0),
        Ok(Completion::Cancelled) => {
            eprintln!("[scriba] cancelled");
            Ok(EXIT_CANCELLED)
        }
        Err(SessionError::StreamUnavailable(e)) => {
            if let Some(input) = &e.restored_input {
                eprintln!("[scriba] not answered: {input}");
            }
            Err(SessionError::StreamUnavailable(e).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Print the stored messages of a conversation.
pub async fn run_history(config: &Config, conversation_id: &str) -> Result<(), CommandError> {
    let client = build_client(config)?;
    let mut session = build_session(config);
    session.select(conversation_id);
    session.load_history(client.load_history(conversation_id).await?);

    let messages: Vec<_> = session
        .state()
        .messages
        .iter()
        .map(|m| m.as_ref().clone())
        .collect();
    let mut view = TerminalView::new(io::stdout(), io::stderr(), Style::new(), false);
    view.emit_history(&messages);
    Ok(())
}

/// Print the user's conversations, one `id  title` line each.
pub async fn run_list(config: &Config) -> Result<(), CommandError> {
    let client = build_client(config)?;
    let conversations = client.list_conversations().await?;

    let mut stdout = io::stdout().lock();
    for conversation in conversations {
        writeln!(stdout, "{}\t{}", conversation.id, conversation.title)?;
    }
    Ok(())
}

/// Dump the decoded event stream of one question, one event per line.
pub async fn run_events(
    config: &Config,
    question: &str,
    conversation_id: Option<&str>,
) -> Result<(), CommandError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(SessionError::EmptyQuery.into());
    }
    let client = build_client(config)?;
    let mut request = ChatRequest::new(question);
    if let Some(id) = conversation_id {
        request = request.in_conversation(id);
    }

    let body = client.open_stream(&request).await?;
    let events = decode_events(body);
    futures::pin_mut!(events);

    let mut stdout = io::stdout().lock();
    while let Some(event) = events.next().await {
        let event = event.map_err(ClientError::from)?;
        writeln!(stdout, "{}", describe_event(&event))?;
    }
    Ok(())
}

/// One-line description of an event for the `--events` dump.
pub fn describe_event(event: &ChatEvent) -> String {
    match event {
        ChatEvent::Status(text) => format!("status: {text}"),
        ChatEvent::Answer(delta) => format!("answer: {delta:?}"),
        ChatEvent::Docs(docs) => {
            let mut line = format!("docs: {} document(s)", docs.len());
            for (index, doc) in docs.iter().enumerate() {
                line.push_str("\n  ");
                line.push_str(format_document(index + 1, doc).trim_start());
            }
            line
        }
        ChatEvent::Other { name } => format!("{name}: (ignored)"),
    }
}
