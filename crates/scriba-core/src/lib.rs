//! scriba-core: Conversation state, stream driver and terminal front end.
//!
//! This crate folds the research-assistant's chat stream into conversation
//! state and renders it. Exposed as a library for integration testing.

pub mod citation;
pub mod commands;
pub mod config;
pub mod driver;
pub mod logging;
pub mod output;
pub mod session;
pub mod state;
pub mod style;

pub use driver::{Completion, Driver, Render, StreamUnavailable};
pub use session::{Session, SessionError};
pub use state::{ChatState, Phase, Reducer, ReducerOptions};
