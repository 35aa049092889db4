//! Shared validation helpers for handlers.

use crate::error::HandlerError;

/// Name reserved for the server's own command prefix.
pub const RESERVED_NAME: &str = "server";

/// Characters that would make a name ambiguous in directed messages or the
/// `who` listing.
const FORBIDDEN_CHARS: [char; 2] = [':', ','];

/// Check the character rules shared by display names and room names.
pub fn is_valid_name(name: &str, max_len: usize) -> bool {
    let len = name.chars().count();
    len >= 1
        && len <= max_len
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(&c))
}

/// Validate a display name for registration.
pub fn validate_display_name(name: &str, max_len: usize) -> Result<(), HandlerError> {
    if is_valid_name(name, max_len) && name != RESERVED_NAME {
        Ok(())
    } else {
        Err(HandlerError::ErroneousName(name.to_string()))
    }
}

/// Validate a room name.
pub fn validate_room_name(room: &str, max_len: usize) -> Result<(), HandlerError> {
    if is_valid_name(room, max_len) {
        Ok(())
    } else {
        Err(HandlerError::ErroneousName(room.to_string()))
    }
}
