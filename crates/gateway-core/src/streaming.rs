//! Canonical delta events, outbound framing, and line reassembly.
//!
//! Outbound records have the form `data: {"content":"..."}` followed by a
//! blank line. The fragment travels as a JSON string, so newlines inside a
//! fragment are escaped and can never be mistaken for a record boundary.
//!
//! Inbound line-delimited upstream bodies are reassembled with
//! [`LineBuffer`]: network chunks are appended as bytes, only complete lines
//! are released, and the trailing partial line is kept for the next chunk.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// End-of-stream sentinel used by SSE upstreams and the outbound stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Outbound completion marker record.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Prefix of an SSE data line.
const DATA_PREFIX: &str = "data: ";

/// One normalized fragment of generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaEvent {
    /// Text fragment, to be appended to everything emitted before it.
    pub content: String,
}

impl DeltaEvent {
    /// Create a delta event.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Serialize a delta event into one outbound record.
#[must_use]
pub fn encode_delta(event: &DeltaEvent) -> Bytes {
    // Serializing a struct with a single String field cannot fail
    let payload = serde_json::to_string(event).unwrap_or_default();
    Bytes::from(format!("{DATA_PREFIX}{payload}\n\n"))
}

/// Longest unterminated line a [`LineBuffer`] holds before giving up.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// An upstream line grew past the buffer limit without a newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("line exceeds {limit} bytes without a newline")]
pub struct LineTooLong {
    /// Configured limit in bytes.
    pub limit: usize,
}

/// Split `pending ++ incoming` into complete lines and the unterminated rest.
///
/// Lines are split on `\n` with a trailing `\r` removed. Splitting happens on
/// bytes, so a multi-byte UTF-8 character cut across two network chunks stays
/// intact in the remainder until its line completes.
#[must_use]
pub fn split_lines(pending: &[u8], incoming: &[u8]) -> (Vec<String>, Vec<u8>) {
    let mut remainder = pending.to_vec();
    let lines = drain_lines(&mut remainder, incoming);
    (lines, remainder)
}

/// Move every line `incoming` completes out of `pending`.
///
/// `pending` never contains a newline, so only `incoming` is scanned.
fn drain_lines(pending: &mut Vec<u8>, incoming: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;

    while let Some(offset) = incoming[start..].iter().position(|b| *b == b'\n') {
        let end = start + offset;
        let line = if pending.is_empty() {
            decode_line(&incoming[start..end])
        } else {
            pending.extend_from_slice(&incoming[start..end]);
            let line = decode_line(pending);
            pending.clear();
            line
        };
        lines.push(line);
        start = end + 1;
    }

    pending.extend_from_slice(&incoming[start..]);
    lines
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Per-stream line reassembly state.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    /// Create an empty buffer holding at most [`MAX_LINE_BYTES`] of partial line.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with a custom partial-line limit.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit,
        }
    }

    /// Feed a network chunk and take every line it completes.
    ///
    /// Fails once the unterminated rest grows past the limit; the buffer is
    /// cleared in that case.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, LineTooLong> {
        let lines = drain_lines(&mut self.pending, chunk);
        if self.pending.len() > self.limit {
            self.pending = Vec::new();
            return Err(LineTooLong { limit: self.limit });
        }
        Ok(lines)
    }

    /// Bytes of the current unterminated line.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Drop any buffered partial line.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Classification of one SSE line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataLine<'a> {
    /// `data: [DONE]`
    Done,
    /// `data: <payload>`
    Payload(&'a str),
}

/// Match a line against the `data: ` prefix.
///
/// Returns `None` for blank lines, comments, `event:` lines and anything
/// else that is not a data line.
#[must_use]
pub fn parse_data_line(line: &str) -> Option<DataLine<'_>> {
    let data = line.strip_prefix(DATA_PREFIX)?;
    if data == DONE_SENTINEL {
        Some(DataLine::Done)
    } else {
        Some(DataLine::Payload(data))
    }
}
