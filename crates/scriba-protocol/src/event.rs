//! Typed events carried by the chat stream.

use crate::document::Document;

/// One decoded event from the chat stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Progress text describing what the server is doing.
    Status(String),

    /// The retrieved reference documents. Replaces any earlier list.
    Docs(Vec<Document>),

    /// A chunk of answer text.
    Answer(String),

    /// An event name this client does not know. Carried so it can be logged,
    /// never applied.
    Other { name: String },
}

impl ChatEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &str {
        match self {
            Self::Status(_) => "status",
            Self::Docs(_) => "docs",
            Self::Answer(_) => "answer",
            Self::Other { name } => name,
        }
    }
}
