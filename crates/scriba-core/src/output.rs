//! Terminal rendering of a conversation while its answer streams in.
//!
//! The answer text goes to `out` (stdout) as it grows; status and the
//! generating indicator go to `err` (stderr). In a TTY the status is a single
//! line overwritten in place and cleared before answer text is written.
//! Without a TTY every status change is its own plain line.

use std::io::Write;

use scriba_protocol::{Document, Message, Role, SourceKind};

use crate::driver::Render;
use crate::state::{ChatState, Phase};
use crate::style::{truncate_display, Style, Tone};

const PREFIX: &str = "[scriba]";
const GENERATING: &str = "generating...";

pub struct TerminalView<O: Write, E: Write> {
    out: O,
    err: E,
    style: Style,
    is_tty: bool,
    term_width: u16,
    /// A submission is being shown.
    active: bool,
    /// Bytes of the open answer already written.
    printed: usize,
    /// The status line currently on screen.
    shown_status: Option<String>,
    /// A TTY status line is on screen and must be cleared.
    line_active: bool,
}

impl<O: Write, E: Write> TerminalView<O, E> {
    pub fn new(out: O, err: E, style: Style, is_tty: bool) -> Self {
        let term_width = if is_tty {
            crossterm::terminal::size().map(|(w, _)| w).unwrap_or(80)
        } else {
            80
        };
        Self::with_width(out, err, style, is_tty, term_width)
    }

    pub fn with_width(out: O, err: E, style: Style, is_tty: bool, term_width: u16) -> Self {
        Self {
            out,
            err,
            style,
            is_tty,
            term_width,
            active: false,
            printed: 0,
            shown_status: None,
            line_active: false,
        }
    }

    pub fn into_writers(self) -> (O, E) {
        (self.out, self.err)
    }

    fn clear_line(&mut self) {
        if self.line_active {
            let _ = write!(self.err, "\r\x1b[K");
            let _ = self.err.flush();
            self.line_active = false;
        }
    }

    fn show_status(&mut self, text: &str, generating: bool) {
        let shown = if generating { GENERATING } else { text };
        if self.shown_status.as_deref() == Some(shown) {
            return;
        }
        self.shown_status = Some(shown.to_string());

        if self.is_tty {
            let max = (self.term_width as usize).saturating_sub(PREFIX.len() + 1);
            let shown = truncate_display(shown, max);
            let _ = write!(
                self.err,
                "\r\x1b[K{} {}",
                self.style.paint(Tone::Prefix, PREFIX),
                self.style.paint(Tone::Status, &shown),
            );
            self.line_active = true;
        } else {
            let _ = writeln!(self.err, "{PREFIX} {shown}");
        }
        let _ = self.err.flush();
    }

    fn write_answer(&mut self, message: &Message) {
        let Some(delta) = message.content.get(self.printed..) else {
            return;
        };
        if delta.is_empty() {
            return;
        }
        self.clear_line();
        let _ = write!(self.out, "{delta}");
        let _ = self.out.flush();
        self.printed = message.content.len();
    }

    fn end_submission(&mut self, state: &ChatState) {
        self.clear_line();
        if self.printed > 0 {
            // The final render can still carry text from a flushed frame
            if let Some(last) = state.last_message().filter(|m| m.role == Role::Ai) {
                self.write_answer(last);
            }
            let _ = writeln!(self.out);
        }

        if let Some(status) = &state.status {
            let line = format!("{PREFIX} {status}");
            let _ = writeln!(self.err, "{}", self.style.paint(Tone::Failure, &line));
        }

        if self.printed > 0 && !state.documents.is_empty() {
            self.emit_documents(&state.documents);
        }

        let _ = self.out.flush();
        let _ = self.err.flush();
        self.active = false;
        self.printed = 0;
        self.shown_status = None;
    }

    /// Write the reference list, marking the documents the answer cites.
    pub fn emit_documents(&mut self, documents: &[Document]) {
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "{}", self.style.paint(Tone::Heading, "References"));
        for (index, doc) in documents.iter().enumerate() {
            let tone = if doc.is_referenced {
                Tone::Cited
            } else {
                Tone::Uncited
            };
            let line = format_document(index + 1, doc);
            let _ = writeln!(self.out, "{}", self.style.paint(tone, &line));
            for source in &doc.sources {
                let _ = writeln!(self.out, "      {}: {}", source_label(source.kind), source.url);
            }
        }
    }

    /// Print stored messages of a conversation.
    pub fn emit_history(&mut self, messages: &[Message]) {
        for message in messages {
            let label = match message.role {
                Role::Human => "you",
                Role::Ai => "assistant",
            };
            let label = format!("{label}:");
            let _ = writeln!(
                self.out,
                "{} {}",
                self.style.paint(Tone::Heading, &label),
                message.content
            );
        }
        let _ = self.out.flush();
    }
}

impl<O: Write, E: Write> Render for TerminalView<O, E> {
    fn render(&mut self, state: &ChatState) {
        if state.phase == Phase::Idle {
            if self.active {
                self.end_submission(state);
            }
            return;
        }
        self.active = true;

        if let Some(answer) = state.open_answer() {
            self.write_answer(answer);
        }

        // Once answer text is flowing a TTY status line would interleave with it
        let answering = self.printed > 0;
        match &state.status {
            Some(status) if !(self.is_tty && answering) => {
                self.show_status(status, state.is_generating)
            }
            _ => {}
        }
    }
}

/// One reference line: `* [2] Title - Author (Year)`, `*` marking a citation.
pub fn format_document(position: usize, doc: &Document) -> String {
    let mark = if doc.is_referenced { '*' } else { ' ' };
    let mut line = format!("{mark} [{position}] {}", doc.title);
    if let Some(attribution) = doc.attribution() {
        line.push_str(" - ");
        line.push_str(&attribution);
    }
    line
}

fn source_label(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::File => "file",
        SourceKind::Web => "web",
        SourceKind::Publication => "publication",
        SourceKind::Unknown => "source",
    }
}
