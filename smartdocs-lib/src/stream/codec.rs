//! NDJSON framing for [`StreamEvent`]s.
//!
//! The encoder writes one compact JSON object followed by `\n` per event.
//! [`LineBuffer`] reassembles lines from arbitrarily split byte chunks and is
//! shared with the model backends, which parse line-oriented upstream streams.

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use super::StreamEvent;

pub const CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid event on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("stream ended inside an event ({0} bytes pending)")]
    Truncated(usize),
}

/// Encode one event as a single NDJSON line
pub fn encode(event: &StreamEvent) -> Result<Bytes, serde_json::Error> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// Accumulates bytes and yields complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator (`\n` or `\r\n`).
    /// Lines that are not valid UTF-8 are decoded lossily.
    pub fn next_line(&mut self) -> Option<String> {
        let newline = self.pending.iter().position(|b| *b == b'\n')?;
        let line = self.pending.split_to(newline + 1);
        let mut end = newline;
        if end > 0 && line[end - 1] == b'\r' {
            end -= 1;
        }
        Some(String::from_utf8_lossy(&line[..end]).into_owned())
    }

    /// Remaining bytes after the last newline
    pub fn remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = self.pending.split();
        Some(String::from_utf8_lossy(&rest).into_owned())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Incremental client-side decoder
///
/// Handles events split across chunks, several events in one chunk, CRLF
/// line endings and blank lines.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    lines: LineBuffer,
    line_no: usize,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every event it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, CodecError> {
        self.lines.extend(chunk);
        let mut events = Vec::new();
        while let Some(line) = self.lines.next_line() {
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str(&line)
                .map_err(|source| CodecError::Json { line: self.line_no, source })?;
            events.push(event);
        }
        Ok(events)
    }

    /// Signal end of input. A non-blank partial line is reported as truncation.
    pub fn finish(mut self) -> Result<(), CodecError> {
        match self.lines.remainder() {
            Some(rest) if !rest.trim().is_empty() => Err(CodecError::Truncated(rest.len())),
            _ => Ok(()),
        }
    }
}
