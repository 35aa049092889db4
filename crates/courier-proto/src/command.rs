//! Client command parsing.
//!
//! ## Syntax
//! ```text
//! server:register <name>
//! server:who
//! server:join <room>
//! server:leave
//! server:exit
//! <recipient>:<body>
//! <free text>
//! ```
//!
//! A line is a directed message when the text before its first `:` is a
//! single non-empty token (no whitespace). Everything else that is not a
//! `server:` command is free text, which the server treats as a room
//! broadcast.

use std::fmt;
use std::str::FromStr;

use crate::error::CommandError;

/// Prefix that marks a line as addressed to the server itself.
pub const SERVER_PREFIX: &str = "server:";

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `server:register <name>`
    Register(String),
    /// `server:who`
    Who,
    /// `server:join <room>`
    Join(String),
    /// `server:leave`
    Leave,
    /// `server:exit`
    Exit,
    /// `<recipient>:<body>`
    Direct {
        /// Name of the recipient identity.
        recipient: String,
        /// Message body with leading whitespace removed.
        body: String,
    },
    /// Any other non-empty line.
    Text(String),
}

impl Command {
    /// Static command name, used for handler dispatch and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register(_) => "REGISTER",
            Self::Who => "WHO",
            Self::Join(_) => "JOIN",
            Self::Leave => "LEAVE",
            Self::Exit => "EXIT",
            Self::Direct { .. } => "DIRECT",
            Self::Text(_) => "TEXT",
        }
    }

    fn parse_server_command(rest: &str) -> Result<Self, CommandError> {
        let rest = rest.trim();
        let (verb, arg) = match rest.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (rest, ""),
        };

        match verb {
            "register" if arg.is_empty() => Err(CommandError::MissingArgument("register")),
            "register" => Ok(Self::Register(arg.to_string())),
            "join" if arg.is_empty() => Err(CommandError::MissingArgument("join")),
            "join" => Ok(Self::Join(arg.to_string())),
            "who" => Ok(Self::Who),
            "leave" => Ok(Self::Leave),
            "exit" => Ok(Self::Exit),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(CommandError::Empty);
        }

        if let Some(rest) = line.strip_prefix(SERVER_PREFIX) {
            return Self::parse_server_command(rest);
        }

        match line.split_once(':') {
            Some((recipient, body)) if is_recipient_token(recipient) => {
                let body = body.trim_start();
                if body.is_empty() {
                    return Err(CommandError::NoTextToSend);
                }
                Ok(Self::Direct {
                    recipient: recipient.to_string(),
                    body: body.to_string(),
                })
            }
            _ => Ok(Self::Text(line.to_string())),
        }
    }
}

fn is_recipient_token(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_whitespace)
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register(name) => write!(f, "{SERVER_PREFIX}register {name}"),
            Self::Who => write!(f, "{SERVER_PREFIX}who"),
            Self::Join(room) => write!(f, "{SERVER_PREFIX}join {room}"),
            Self::Leave => write!(f, "{SERVER_PREFIX}leave"),
            Self::Exit => write!(f, "{SERVER_PREFIX}exit"),
            Self::Direct { recipient, body } => write!(f, "{recipient}:{body}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}
