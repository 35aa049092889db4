//! # courier-proto
//!
//! Wire protocol for the courier message router.
//!
//! The protocol is line-oriented UTF-8 text: every client command and every
//! server reply is a single `\n`-terminated line.
//!
//! ## Features
//!
//! - [`Command`]: parsing of client lines (`server:register alice`,
//!   `bob:hello`, free text)
//! - [`Reply`]: server lines (`Welcome alice!`, `ERROR:<reason>`, ...)
//! - [`LineCodec`]: a `tokio-util` codec with a line length limit that keeps
//!   the stream usable after an oversized line
//!
//! ## Quick Start
//!
//! ```rust
//! use courier_proto::{Command, Reply};
//!
//! let cmd: Command = "bob:hi there".parse().expect("valid command");
//! assert_eq!(
//!     cmd,
//!     Command::Direct { recipient: "bob".into(), body: "hi there".into() }
//! );
//!
//! let reply = Reply::direct("alice", "hi there");
//! assert_eq!(reply.to_string(), "alice: hi there");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
#[cfg(feature = "tokio")]
pub mod line;
pub mod reply;

pub use self::command::{Command, SERVER_PREFIX};
pub use self::error::{CommandError, ProtocolError};
#[cfg(feature = "tokio")]
pub use self::line::{Inbound, LineCodec};
pub use self::reply::Reply;
