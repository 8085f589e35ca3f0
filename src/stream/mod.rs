//! SSE plumbing: incremental line splitting and frame encoding.

pub mod transcoder;

pub use transcoder::{transcode_sse_stream, StreamTranscoder};

use bytes::Bytes;
use memchr::memchr_iter;

pub(crate) const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Incremental newline splitter over a byte stream.
///
/// Append each arriving chunk; complete lines come out immediately and at
/// most one partial line is held back for the next chunk. Chunk boundaries
/// inside a UTF-8 sequence only matter for the held-back tail, which is
/// re-examined once the line completes.
#[derive(Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and push every completed line (without its terminator).
    pub fn feed_into(&mut self, chunk: &[u8], out: &mut Vec<String>) {
        self.buffer.extend_from_slice(chunk);
        let mut consumed = 0;
        for line_end in memchr_iter(b'\n', &self.buffer) {
            let mut line = &self.buffer[consumed..line_end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            out.push(String::from_utf8_lossy(line).into_owned());
            consumed = line_end + 1;
        }
        if consumed > 0 {
            self.buffer.drain(..consumed);
        }
    }

    /// Hand out the trailing partial line once the input stream has closed.
    #[must_use]
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let tail = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        Some(tail)
    }
}

/// Extract the payload of an SSE `data:` line.
///
/// Blank lines, comment lines (`:`), and non-data fields (`event:`, `id:`)
/// yield `None`.
#[must_use]
pub(crate) fn sse_data_payload(line: &str) -> Option<&str> {
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = line.strip_prefix("data:")?;
    Some(payload.strip_prefix(' ').unwrap_or(payload))
}

/// Format an OpenAI-style SSE frame (no event name, just data).
#[must_use]
pub(crate) fn openai_sse_frame(json: &str) -> Bytes {
    let mut out = String::with_capacity(10 + json.len());
    out.push_str("data: ");
    out.push_str(json);
    out.push_str("\n\n");
    Bytes::from(out)
}
