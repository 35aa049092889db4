//! Server replies.
//!
//! Every variant renders to exactly one line (without the terminator) via
//! [`Display`](std::fmt::Display).

use std::fmt;

/// A line sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `Welcome <name>!`
    Welcome {
        /// The registered name.
        name: String,
    },
    /// `ERROR:<reason>`
    Error {
        /// Human readable reason.
        reason: String,
    },
    /// `Active users: <a>, <b>, ...`
    ActiveUsers(Vec<String>),
    /// `<sender>: <body>`
    Direct {
        /// Sending identity.
        sender: String,
        /// Message body.
        body: String,
    },
    /// `<sender> (in <room>): <body>`
    Room {
        /// Sending identity.
        sender: String,
        /// Room the message was sent to.
        room: String,
        /// Message body.
        body: String,
    },
    /// `Goodbye!`
    Goodbye,
    /// `Joined <room>`
    Joined {
        /// Room that was joined.
        room: String,
    },
    /// `Left <room>`
    Left {
        /// Room that was left.
        room: String,
    },
    /// `Saved message for <recipient>`
    Saved {
        /// Offline recipient the message was queued for.
        recipient: String,
    },
    /// `* <name> joined <room>`
    Arrived {
        /// Identity that joined.
        name: String,
        /// Room that was joined.
        room: String,
    },
    /// `* <name> left <room>`
    Departed {
        /// Identity that left.
        name: String,
        /// Room that was left.
        room: String,
    },
}

impl Reply {
    /// Build an `ERROR:` reply.
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
        }
    }

    /// Build a directed message delivery.
    pub fn direct(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Direct {
            sender: sender.into(),
            body: body.into(),
        }
    }

    /// Build a room broadcast delivery.
    pub fn room(
        sender: impl Into<String>,
        room: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::Room {
            sender: sender.into(),
            room: room.into(),
            body: body.into(),
        }
    }

    /// Whether this is an `ERROR:` line.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Welcome { name } => write!(f, "Welcome {name}!"),
            Self::Error { reason } => write!(f, "ERROR:{reason}"),
            Self::ActiveUsers(names) => write!(f, "Active users: {}", names.join(", ")),
            Self::Direct { sender, body } => write!(f, "{sender}: {body}"),
            Self::Room { sender, room, body } => write!(f, "{sender} (in {room}): {body}"),
            Self::Goodbye => f.write_str("Goodbye!"),
            Self::Joined { room } => write!(f, "Joined {room}"),
            Self::Left { room } => write!(f, "Left {room}"),
            Self::Saved { recipient } => write!(f, "Saved message for {recipient}"),
            Self::Arrived { name, room } => write!(f, "* {name} joined {room}"),
            Self::Departed { name, room } => write!(f, "* {name} left {room}"),
        }
    }
}
