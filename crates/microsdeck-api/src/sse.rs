// Incremental decoder for the backend's `/listen` event stream.
//
// The stream is a sequence of blocks separated by a blank line, each block
// made of `field: value` lines:
//
//     event: update
//     data: x
//     id: 1
//
// A decoder is created per stream. It carries a partial block across
// `push` calls, so chunk boundaries may fall anywhere, including inside a
// multi-byte character.

use bytes::{Buf, BytesMut};
use strum::Display;
use thiserror::Error;
use tracing::{debug, trace};

use crate::models::ServerEvent;

// ── Errors ───────────────────────────────────────────────────────────

/// A block that cannot be decoded. Fatal for the stream it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no key present in event line {line:?}")]
    MissingKey { line: String },

    #[error("event block is not valid UTF-8")]
    InvalidUtf8,

    #[error("event block exceeds {limit} bytes without a terminating blank line")]
    BlockTooLarge { limit: usize },
}

// ── Lifecycle markers ────────────────────────────────────────────────

/// Markers emitted around the events of one `/listen` stream.
///
/// Kept apart from domain events so listeners for one never see the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleEvent {
    /// The response headers arrived and the body is being read.
    Start,
    /// Emitted after every decoded event.
    Change,
    /// The body ended cleanly.
    Close,
    /// Reading stopped because of a transport error, decode error, or
    /// cancellation.
    Abort,
}

// ── Decoder ──────────────────────────────────────────────────────────

/// Upper bound on an unterminated block held between chunks.
pub const MAX_BLOCK_BYTES: usize = 64 * 1024;

#[derive(Debug, Default)]
pub struct EventDecoder {
    buffer: BytesMut,
    /// Offset up to which `buffer` is known to contain no block separator.
    scanned: usize,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<ServerEvent>, DecodeError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((end, separator_len)) = find_separator(&self.buffer, self.scanned) {
            let block = self.buffer.split_to(end);
            self.buffer.advance(separator_len);
            self.scanned = 0;

            let text = std::str::from_utf8(&block).map_err(|_| DecodeError::InvalidUtf8)?;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            events.push(decode_event(text)?);
        }

        if self.buffer.len() > MAX_BLOCK_BYTES {
            return Err(DecodeError::BlockTooLarge {
                limit: MAX_BLOCK_BYTES,
            });
        }

        // A separator can straddle two chunks; rescan the last two bytes.
        self.scanned = self.buffer.len().saturating_sub(2);
        Ok(events)
    }

    /// Number of buffered bytes that do not yet form a complete block.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Find the first blank-line separator at or after `from`.
///
/// Returns the block end and the separator length. Accepts `\n\n` and
/// `\n\r\n` (the tail of `\r\n\r\n`).
fn find_separator(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' {
            if buf[i + 1] == b'\n' {
                return Some((i, 2));
            }
            if buf[i + 1] == b'\r' && buf.get(i + 2) == Some(&b'\n') {
                return Some((i, 3));
            }
        }
        i += 1;
    }
    None
}

/// Decode a single block (without its terminating blank line).
///
/// Repeated `data:` lines are joined with `\n`. Unknown fields are skipped.
pub fn decode_event(block: &str) -> Result<ServerEvent, DecodeError> {
    debug!(block, "decoding event block");

    let mut event = ServerEvent::default();

    for line in block.lines() {
        let Some((key, value)) = line.split_once(':') else {
            return Err(DecodeError::MissingKey { line: line.into() });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(DecodeError::MissingKey { line: line.into() });
        }
        let value = value.trim();

        match key {
            "event" => value.clone_into(&mut event.event),
            "id" => event.id = Some(value.to_owned()),
            "data" => match event.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => event.data = Some(value.to_owned()),
            },
            other => trace!(field = other, "ignoring unknown event field"),
        }
    }

    Ok(event)
}

// ── Tests ────────────────────────────────────────────────────────────
