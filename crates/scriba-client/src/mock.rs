//! Mock chat streams for testing.
//!
//! Produces the exact bytes the research-assistant server writes, so tests at
//! every layer can run the real framing and decoding path without HTTP.

use std::time::Duration;

use async_stream::stream;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use scriba_protocol::Document;
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;

/// Transport failure injected by a mock stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mock transport error: {0}")]
pub struct MockTransportError(pub String);

/// One step of a mock server response.
#[derive(Debug, Clone)]
pub enum MockFrame {
    /// A `status` event.
    Status(String),
    /// A `docs` event.
    Docs(Vec<Document>),
    /// An `answer` event.
    Answer(String),
    /// An event with an arbitrary name and JSON payload.
    Event { name: String, payload: Value },
    /// Text written verbatim, for malformed or partial frames.
    Raw(String),
    /// Fail the transport at this point.
    Error(String),
    /// Pause before the next step.
    Delay { ms: u64 },
}

/// Configuration for a mock response body.
#[derive(Debug, Clone, Default)]
pub struct MockChunks {
    /// Steps to emit, in order.
    pub frames: Vec<MockFrame>,
    /// Re-chunk the body into slices of at most this many bytes.
    pub chunk_size: Option<usize>,
    /// Optional delay before each chunk (ms).
    pub chunk_delay_ms: Option<u64>,
}

/// Render one frame as it appears on the wire.
pub fn encode_frame(name: &str, payload: &Value) -> String {
    format!("event: {name}\ndata: {payload}\n\n")
}

enum Segment {
    Bytes(Vec<u8>),
    Error(String),
    Delay(u64),
}

impl MockChunks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frames(mut self, frames: Vec<MockFrame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    pub fn with_chunk_delay(mut self, ms: u64) -> Self {
        self.chunk_delay_ms = Some(ms);
        self
    }

    /// The full body text up to the first injected error.
    pub fn body(&self) -> String {
        let mut body = String::new();
        for frame in &self.frames {
            match frame {
                MockFrame::Error(_) => break,
                MockFrame::Delay { .. } => {}
                other => body.push_str(&encode_step(other)),
            }
        }
        body
    }

    fn segments(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut current = Vec::new();

        for frame in &self.frames {
            match frame {
                MockFrame::Error(message) => {
                    segments.push(Segment::Bytes(std::mem::take(&mut current)));
                    segments.push(Segment::Error(message.clone()));
                }
                MockFrame::Delay { ms } => {
                    segments.push(Segment::Bytes(std::mem::take(&mut current)));
                    segments.push(Segment::Delay(*ms));
                }
                other => current.extend_from_slice(encode_step(other).as_bytes()),
            }
        }
        segments.push(Segment::Bytes(current));
        segments
    }

    /// Build the byte stream. The stream ends after an injected error.
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes, MockTransportError>> {
        let segments = self.segments();
        let chunk_size = self.chunk_size;
        let chunk_delay_ms = self.chunk_delay_ms;

        stream! {
            for segment in segments {
                match segment {
                    Segment::Bytes(bytes) => {
                        let size = chunk_size.unwrap_or(bytes.len().max(1));
                        for chunk in bytes.chunks(size) {
                            if let Some(delay_ms) = chunk_delay_ms {
                                sleep(Duration::from_millis(delay_ms)).await;
                            }
                            yield Ok(Bytes::copy_from_slice(chunk));
                        }
                    }
                    Segment::Error(message) => {
                        yield Err(MockTransportError(message));
                        return;
                    }
                    Segment::Delay(ms) => {
                        sleep(Duration::from_millis(ms)).await;
                    }
                }
            }
        }
        .boxed()
    }
}

fn encode_step(frame: &MockFrame) -> String {
    match frame {
        MockFrame::Status(text) => encode_frame("status", &Value::from(text.as_str())),
        MockFrame::Docs(docs) => encode_frame(
            "docs",
            &serde_json::to_value(docs).unwrap_or(Value::Array(Vec::new())),
        ),
        MockFrame::Answer(text) => encode_frame("answer", &Value::from(text.as_str())),
        MockFrame::Event { name, payload } => encode_frame(name, payload),
        MockFrame::Raw(text) => text.clone(),
        MockFrame::Error(_) | MockFrame::Delay { .. } => String::new(),
    }
}

/// Built-in test fixtures for common scenarios.
pub mod fixtures {
    use super::*;
    use scriba_protocol::SourceKind;

    /// Status, then the answer in the given chunks.
    pub fn streaming_answer(chunks: &[&str]) -> MockChunks {
        let mut frames = vec![MockFrame::Status("Thinking".to_string())];
        frames.extend(chunks.iter().map(|c| MockFrame::Answer((*c).to_string())));
        MockChunks::new().with_frames(frames)
    }

    /// The usual server sequence: searching, documents, generating, answer.
    pub fn answer_with_docs(
        docs: Vec<Document>,
        generating_phrase: &str,
        chunks: &[&str],
    ) -> MockChunks {
        let mut frames = vec![
            MockFrame::Status("Searching the knowledge base".to_string()),
            MockFrame::Docs(docs),
            MockFrame::Status(generating_phrase.to_string()),
        ];
        frames.extend(chunks.iter().map(|c| MockFrame::Answer((*c).to_string())));
        MockChunks::new().with_frames(frames)
    }

    /// Some answer text, then a transport failure.
    pub fn error_mid_stream(text_before: &str, error: &str) -> MockChunks {
        MockChunks::new().with_frames(vec![
            MockFrame::Answer(text_before.to_string()),
            MockFrame::Error(error.to_string()),
        ])
    }

    /// Two reference documents, as the retrieval step returns them.
    pub fn two_documents() -> Vec<Document> {
        vec![
            Document::new("On Computable Numbers", 0.92)
                .with_author("Turing")
                .with_year("1936")
                .with_source(
                    SourceKind::Publication,
                    "https://doi.org/10.1112/plms/s2-42.1.230",
                ),
            Document::new("A Mathematical Theory of Communication", 0.81)
                .with_author("Shannon")
                .with_year("1948")
                .with_source(SourceKind::File, "/library/shannon1948.pdf"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(chunks: MockChunks) -> Vec<Result<Bytes, MockTransportError>> {
        chunks.into_stream().collect().await
    }

    #[test]
    fn encode_frame_format() {
        assert_eq!(
            encode_frame("answer", &Value::from("Hi \"there\"")),
            "event: answer\ndata: \"Hi \\\"there\\\"\"\n\n"
        );
    }

    #[test]
    fn body_stops_at_error() {
        let chunks = fixtures::error_mid_stream("partial", "reset");
        assert_eq!(chunks.body(), "event: answer\ndata: \"partial\"\n\n");
    }

    #[tokio::test]
    async fn single_chunk_by_default() {
        let chunks = fixtures::streaming_answer(&["Hello", " world"]);
        let body = chunks.body();
        let items = collect(chunks).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), body.as_bytes());
    }

    #[tokio::test]
    async fn rechunks_body() {
        let chunks = fixtures::streaming_answer(&["Hello"]).with_chunk_size(7);
        let body = chunks.body();
        let items = collect(chunks).await;
        assert!(items.len() > 1);
        assert!(items.iter().all(|item| item.as_ref().unwrap().len() <= 7));

        let joined: Vec<u8> = items
            .into_iter()
            .flat_map(|item| item.unwrap().to_vec())
            .collect();
        assert_eq!(joined, body.as_bytes());
    }

    #[tokio::test]
    async fn error_ends_stream() {
        let chunks = fixtures::error_mid_stream("partial", "connection reset");
        let items = collect(chunks).await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(
            items[1].as_ref().unwrap_err(),
            &MockTransportError("connection reset".to_string())
        );
    }

    #[tokio::test]
    async fn fixture_answer_with_docs() {
        let chunks =
            fixtures::answer_with_docs(fixtures::two_documents(), "Generating", &["See [^1]."]);
        let body = chunks.body();
        assert!(body.starts_with("event: status\n"));
        assert!(body.contains("event: docs\ndata: [{"));
        assert!(body.contains("\"On Computable Numbers\""));
        assert!(body.ends_with("event: answer\ndata: \"See [^1].\"\n\n"));
    }
}
