//! Error types for the courier protocol library.
//!
//! [`ProtocolError`] covers transport-level failures raised by the line
//! codec. [`CommandError`] covers lines that were framed correctly but do not
//! form a valid command.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Transport-level protocol errors. All of them end the connection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line was not valid UTF-8.
    #[error("invalid UTF-8 in line at byte {byte_pos}: {details}")]
    InvalidUtf8 {
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
        /// Detailed error message from the UTF-8 decoder.
        details: String,
    },

    /// A line contained a control character the protocol does not carry.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),
}

/// Errors produced while parsing a framed line into a [`Command`].
///
/// [`Command`]: crate::Command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CommandError {
    /// The line was empty or whitespace only.
    #[error("empty line")]
    Empty,

    /// `server:<verb>` with a verb the server does not know.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A server command that requires an argument was sent without one.
    #[error("missing argument for {0}")]
    MissingArgument(&'static str),

    /// A directed message with nothing after the separator.
    #[error("no text to send")]
    NoTextToSend,
}
