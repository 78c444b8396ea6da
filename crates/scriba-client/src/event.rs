//! Decoding frames into typed chat events.

use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use scriba_protocol::{ChatEvent, Document};
use serde_json::Value;
use thiserror::Error;

use crate::frame::{parse_frame, Frame, FrameBuffer};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("`{event}` payload is not JSON: {source}")]
    Json {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{event}` payload has the wrong shape: {source}")]
    Shape {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode one frame's JSON payload into the event its name announces.
///
/// Unknown event names still need a JSON payload and decode to
/// `ChatEvent::Other`.
pub fn decode_event(frame: &Frame) -> Result<ChatEvent, DecodeError> {
    let value: Value = serde_json::from_str(&frame.data).map_err(|source| DecodeError::Json {
        event: frame.event.clone(),
        source,
    })?;

    let shape = |source: serde_json::Error| DecodeError::Shape {
        event: frame.event.clone(),
        source,
    };

    match frame.event.as_str() {
        "status" => Ok(ChatEvent::Status(
            serde_json::from_value(value).map_err(shape)?,
        )),
        "docs" => Ok(ChatEvent::Docs(
            serde_json::from_value::<Vec<Document>>(value).map_err(shape)?,
        )),
        "answer" => Ok(ChatEvent::Answer(
            serde_json::from_value(value).map_err(shape)?,
        )),
        other => Ok(ChatEvent::Other {
            name: other.to_string(),
        }),
    }
}

/// Parse and decode the text of one delimited frame.
///
/// Frames missing a field and payloads that fail to decode are logged and
/// yield `None`; neither ends the stream.
pub fn decode_frame_text(text: &str) -> Option<ChatEvent> {
    let Some(frame) = parse_frame(text) else {
        if !text.trim().is_empty() {
            tracing::debug!(frame = %text, "dropping incomplete frame");
        }
        return None;
    };
    match decode_event(&frame) {
        Ok(event) => {
            tracing::debug!(event = event.name(), "decoded frame");
            Some(event)
        }
        Err(e) => {
            tracing::warn!("skipping frame: {e}");
            None
        }
    }
}

/// Turn a response body into a stream of chat events.
///
/// Only a transport error is surfaced, and it ends the stream without
/// flushing the partial frame. At a clean end of stream the trailing
/// partial frame is decoded as one last frame.
pub fn decode_events<S, E>(mut body: S) -> impl Stream<Item = Result<ChatEvent, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    stream! {
        let mut buffer = FrameBuffer::new();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => {
                    for text in buffer.push(&chunk) {
                        if let Some(event) = decode_frame_text(&text) {
                            yield Ok(event);
                        }
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
        if let Some(event) = buffer.finish().as_deref().and_then(decode_frame_text) {
            yield Ok(event);
        }
    }
}
