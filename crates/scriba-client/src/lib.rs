//! scriba-client: Transport side of the scriba research-assistant client.
//!
//! This crate opens chat streams against the research-assistant server,
//! splits the response body into frames, and decodes frames into typed
//! `ChatEvent`s.

pub mod client;
pub mod event;
pub mod frame;
pub mod mock;

pub use client::{ByteStream, ChatClient, ClientConfig, ClientError};
pub use event::{decode_event, decode_events, decode_frame_text, DecodeError};
pub use frame::{parse_frame, Frame, FrameBuffer};
pub use mock::{MockChunks, MockFrame, MockTransportError};
