//! Command handler context.
//!
//! Defines the `Context<'a, S>` struct passed to all handlers. The type
//! parameter `S` is the session state type:
//! - `Context<'a, UnregisteredState>` for pre-registration handlers
//! - `Context<'a, RegisteredState>` for post-registration handlers

use crate::state::{ConnectionHandle, Matrix, SessionId, SessionState};
use courier_proto::Reply;
use std::net::SocketAddr;
use std::sync::Arc;

/// Handler context passed to each command handler.
pub struct Context<'a, S> {
    /// This connection's session ID.
    pub session: SessionId,
    /// Shared server state.
    pub matrix: &'a Arc<Matrix>,
    /// This connection's own handle, for binding into the stores.
    pub handle: &'a ConnectionHandle,
    /// Session state (type varies by registration phase).
    pub state: &'a mut S,
    /// Remote address of the client.
    pub remote_addr: SocketAddr,
    /// Replies to this client, written by the connection loop after the
    /// handler returns.
    replies: &'a mut Vec<Reply>,
}

impl<'a, S> Context<'a, S> {
    pub fn new(
        matrix: &'a Arc<Matrix>,
        handle: &'a ConnectionHandle,
        state: &'a mut S,
        remote_addr: SocketAddr,
        replies: &'a mut Vec<Reply>,
    ) -> Self {
        Self {
            session: handle.session(),
            matrix,
            handle,
            state,
            remote_addr,
            replies,
        }
    }

    /// Queue a reply to this client.
    #[inline]
    pub fn reply(&mut self, reply: Reply) {
        self.replies.push(reply);
    }
}

impl<S: SessionState> Context<'_, S> {
    /// The registered name, or `*` before registration.
    pub fn identity(&self) -> &str {
        self.state.name().unwrap_or("*")
    }
}
