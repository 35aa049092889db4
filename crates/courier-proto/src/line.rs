//! Line-based codec for tokio.
//!
//! Reads `\n`-terminated UTF-8 lines (an optional `\r` before the `\n` is
//! stripped) and writes [`Reply`] values as `\n`-terminated lines.
//!
//! Oversized lines are not a stream error: `FramedRead` stops yielding items
//! after the first decoder error, so the codec discards the oversized line
//! and yields [`Inbound::TooLong`] instead, keeping the connection usable.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};
use crate::reply::Reply;

/// Default maximum line length in bytes, excluding the terminator.
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A complete line with its terminator removed.
    Line(String),
    /// A line longer than the configured limit was read and discarded.
    TooLong {
        /// Total bytes discarded, terminator included.
        length: usize,
    },
}

/// Line-based codec that handles newline-terminated messages.
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length
    max_len: usize,
    /// Bytes dropped so far from an oversized line still being read
    discarding: Option<usize>,
}

impl LineCodec {
    /// Create a codec with [`DEFAULT_MAX_LINE_LEN`].
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    /// Create a codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: None,
        }
    }

    /// The configured maximum line length.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    fn validate_line(s: &str) -> error::Result<()> {
        match s.chars().find(|&ch| ch.is_control() && ch != '\t') {
            Some(ch) => Err(ProtocolError::IllegalControlChar(ch)),
            None => Ok(()),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Inbound;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<Inbound>> {
        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            // A partial line this long cannot end up within the limit,
            // even if its last byte turns out to be a '\r'.
            if self.discarding.is_some() || src.len() > self.max_len + 1 {
                *self.discarding.get_or_insert(0) += src.len();
                src.clear();
                self.next_index = 0;
            } else {
                self.next_index = src.len();
            }
            return Ok(None);
        };

        let line = src.split_to(self.next_index + offset + 1);
        self.next_index = 0;

        if let Some(discarded) = self.discarding.take() {
            return Ok(Some(Inbound::TooLong {
                length: discarded + line.len(),
            }));
        }

        let mut content = &line[..line.len() - 1];
        if let Some(stripped) = content.strip_suffix(b"\r") {
            content = stripped;
        }

        if content.len() > self.max_len {
            return Ok(Some(Inbound::TooLong { length: line.len() }));
        }

        let text = std::str::from_utf8(content).map_err(|e| ProtocolError::InvalidUtf8 {
            byte_pos: e.valid_up_to(),
            details: e.to_string(),
        })?;
        Self::validate_line(text)?;

        Ok(Some(Inbound::Line(text.to_string())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<Inbound>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // An unterminated trailing fragment is dropped with the connection.
                src.clear();
                self.next_index = 0;
                self.discarding = None;
                Ok(None)
            }
        }
    }
}

impl Encoder<&Reply> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, reply: &Reply, dst: &mut BytesMut) -> error::Result<()> {
        let line = reply.to_string();
        dst.reserve(line.len() + 1);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\n");
        Ok(())
    }
}
