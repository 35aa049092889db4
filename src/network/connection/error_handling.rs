//! Error handling utilities for connection management.
//!
//! Classification of transport read errors and the fixed error lines the
//! connection loop sends on its own behalf.

use crate::error::HandlerError;
use crate::handlers::record_error;
use courier_proto::{CommandError, ProtocolError, Reply};

/// Sent when a line exceeds `limits.max_line_length`; the session continues.
pub(super) const INPUT_TOO_LONG: &str = "Input line too long";
/// Sent before closing a connection that did not register in time.
pub(super) const REGISTRATION_TIMEOUT: &str = "Registration timeout";
/// Sent before closing a registered session that stayed silent too long.
pub(super) const IDLE_TIMEOUT: &str = "Idle timeout";

/// Metric label for lines that failed to parse.
const PARSE_COMMAND: &str = "PARSE";
/// Metric label for read/write failures on the socket.
const TRANSPORT_COMMAND: &str = "TRANSPORT";

/// Classification of transport read errors for appropriate handling.
#[derive(Debug)]
pub(super) enum ReadErrorAction {
    /// Protocol violation - send ERROR line and disconnect
    FatalProtocolError { error_msg: String },
    /// I/O error - connection is broken, just log and disconnect
    IoError,
}

/// Classify a transport read error into an actionable category.
pub(super) fn classify_read_error(e: &ProtocolError) -> ReadErrorAction {
    match e {
        ProtocolError::InvalidUtf8 { byte_pos, .. } => ReadErrorAction::FatalProtocolError {
            error_msg: format!("Invalid UTF-8 at byte {byte_pos}"),
        },
        ProtocolError::IllegalControlChar(ch) => ReadErrorAction::FatalProtocolError {
            error_msg: format!("Illegal control character: {ch:?}"),
        },
        ProtocolError::Io(_) => ReadErrorAction::IoError,
        // Handle future variants gracefully
        _ => ReadErrorAction::FatalProtocolError {
            error_msg: format!("Protocol error: {e}"),
        },
    }
}

/// Map a parse failure before registration.
///
/// Only a malformed `register` keeps its specific error; any other input
/// means the client has to register first.
pub(super) fn pre_reg_parse_error(err: CommandError) -> HandlerError {
    let err = match err {
        CommandError::MissingArgument(verb @ "register") => HandlerError::NeedMoreParams(verb),
        _ => HandlerError::NotRegistered,
    };
    record_error(PARSE_COMMAND, &err);
    err
}

/// Map a parse failure for a registered session.
pub(super) fn post_reg_parse_error(err: CommandError) -> HandlerError {
    let err = HandlerError::from(err);
    record_error(PARSE_COMMAND, &err);
    err
}

/// Record a read or write failure that ends the session.
pub(super) fn record_transport_closed() {
    record_error(TRANSPORT_COMMAND, &HandlerError::TransportClosed);
}

/// Append the client-visible form of `err`, if it has one.
///
/// Returns `true` if the error ends the session.
pub(super) fn push_error_reply(err: &HandlerError, replies: &mut Vec<Reply>) -> bool {
    match err.to_reply() {
        Some(reply) => {
            replies.push(reply);
            false
        }
        None => true,
    }
}
