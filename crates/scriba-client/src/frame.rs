//! Event-stream framing.
//!
//! The chat endpoint speaks a restricted form of server-sent events: every
//! frame is a block of `event:` / `data:` lines terminated by a blank line.
//! Chunks from the transport are accumulated in a `FrameBuffer` until a
//! `"\n\n"` delimiter completes a frame; whatever follows the last delimiter
//! stays buffered for the next chunk.

const DELIMITER: &[u8] = b"\n\n";

/// A complete frame carrying both an event name and a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The event name (from the `event:` line), trimmed.
    pub event: String,
    /// The raw payload (from the `data:` line), trimmed. Expected to be JSON.
    pub data: String,
}

/// Parse the text of one delimited frame.
///
/// A later `event:` or `data:` line replaces an earlier one. Returns `None`
/// when either field is missing or empty; such frames are dropped.
pub fn parse_frame(text: &str) -> Option<Frame> {
    let mut event = None;
    let mut data = None;

    for line in text.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("data:") {
            data = Some(value.trim());
        }
        // Comments, `id:`, `retry:` and stray text are ignored
    }

    match (event, data) {
        (Some(event), Some(data)) if !event.is_empty() && !data.is_empty() => Some(Frame {
            event: event.to_string(),
            data: data.to_string(),
        }),
        _ => None,
    }
}

/// Undelivered bytes of the stream.
///
/// Bytes are kept raw until a frame is complete so that multi-byte UTF-8
/// characters split across chunks are decoded intact.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the text of every frame it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // The buffer holds no delimiter, but its last byte may be the first
        // half of one.
        let mut search_from = self.buf.len().saturating_sub(1);
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = find_delimiter(&self.buf[search_from..]) {
            let end = search_from + offset;
            frames.push(String::from_utf8_lossy(&self.buf[consumed..end]).into_owned());
            consumed = end + DELIMITER.len();
            search_from = consumed;
        }
        self.buf.drain(..consumed);

        frames
    }

    /// Take the trailing partial frame at end of stream.
    ///
    /// Returns `None` if nothing but whitespace is buffered.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        let text = String::from_utf8_lossy(&rest);
        if text.trim().is_empty() {
            None
        } else {
            Some(text.into_owned())
        }
    }

    /// Bytes still waiting for a delimiter.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER)
}
