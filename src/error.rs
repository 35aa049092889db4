//! Unified error handling for courierd.
//!
//! This module provides the error hierarchy for command handling, with
//! conversions from protocol parse errors, wire reply generation, and metric
//! labeling.

use courier_proto::{CommandError, Reply};
use thiserror::Error;

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors that can occur during command handling.
///
/// Everything except [`Quit`](Self::Quit) and
/// [`TransportClosed`](Self::TransportClosed) is reported to the client as an
/// `ERROR:` line and the session continues.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("name {0} is already taken")]
    NameTaken(String),

    #[error("invalid name: {0}")]
    ErroneousName(String),

    #[error("not registered")]
    NotRegistered,

    #[error("already registered as {0}")]
    AlreadyRegistered(String),

    #[error("invalid message format")]
    InvalidFormat,

    #[error("no text to send")]
    NoTextToSend,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("missing argument for {0}")]
    NeedMoreParams(&'static str),

    #[error("not in a room")]
    NoRoom,

    #[error("mailbox for {0} is full")]
    MailboxFull(String),

    #[error("delivery to {recipient} failed: {source}")]
    DeliveryFailed {
        recipient: String,
        #[source]
        source: DeliveryError,
    },

    #[error("client quit")]
    Quit,

    #[error("transport closed")]
    TransportClosed,
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NameTaken(_) => "name_taken",
            Self::ErroneousName(_) => "erroneous_name",
            Self::NotRegistered => "not_registered",
            Self::AlreadyRegistered(_) => "already_registered",
            Self::InvalidFormat => "invalid_format",
            Self::NoTextToSend => "no_text_to_send",
            Self::UnknownCommand(_) => "unknown_command",
            Self::NeedMoreParams(_) => "need_more_params",
            Self::NoRoom => "no_room",
            Self::MailboxFull(_) => "mailbox_full",
            Self::DeliveryFailed { .. } => "delivery_failed",
            Self::Quit => "quit",
            Self::TransportClosed => "transport_closed",
        }
    }

    /// Convert to an `ERROR:` reply.
    ///
    /// Returns `None` for errors that end the session instead of producing a
    /// client-visible error line.
    pub fn to_reply(&self) -> Option<Reply> {
        let reason = match self {
            Self::NameTaken(name) => format!("Name {name} is already taken"),
            Self::ErroneousName(name) => format!("Invalid name: {name}"),
            Self::NotRegistered => "You must register a name first.".to_string(),
            Self::AlreadyRegistered(name) => format!("Already registered as {name}"),
            Self::InvalidFormat => "Invalid message format.".to_string(),
            Self::NoTextToSend => "No text to send".to_string(),
            Self::UnknownCommand(verb) => format!("Unknown command: {verb}"),
            Self::NeedMoreParams(verb) => format!("Missing argument for {verb}"),
            Self::NoRoom => "You are not in a room".to_string(),
            Self::MailboxFull(name) => format!("Mailbox for {name} is full"),
            Self::DeliveryFailed { recipient, .. } => {
                format!("Failed to send message to {recipient}")
            }

            // These end the session
            Self::Quit => return None,
            Self::TransportClosed => return None,
        };

        Some(Reply::error(reason))
    }
}

impl From<CommandError> for HandlerError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::UnknownCommand(verb) => Self::UnknownCommand(verb),
            CommandError::MissingArgument(verb) => Self::NeedMoreParams(verb),
            CommandError::NoTextToSend => Self::NoTextToSend,
            // Blank lines are skipped before parsing; treat any that slip
            // through like other unparseable input.
            _ => Self::InvalidFormat,
        }
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Delivery Errors (writes into another session's outgoing queue)
// ============================================================================

/// Failure to hand a reply to a connection's outgoing queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("outgoing queue full")]
    QueueFull,

    #[error("connection closed")]
    Closed,
}
