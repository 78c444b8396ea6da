//! scriba-protocol: Shared types for the scriba research-assistant client.
//!
//! This crate defines the data exchanged with the research-assistant server
//! (reference documents, conversation messages, requests) and the typed
//! events carried by its chat stream.

pub mod document;
pub mod event;
pub mod message;

pub use document::{Document, SourceKind, SourceLocator};
pub use event::ChatEvent;
pub use message::{ChatRequest, ConversationSummary, Message, Role};
