//! Command handlers.
//!
//! This module contains the handler traits and the command registry that
//! dispatches parsed [`Command`](courier_proto::Command)s to them.

mod channel;
mod connection;
mod core;
mod helpers;
mod messaging;
mod user_query;

pub use self::core::{Context, PostRegHandler, PreRegHandler, Registry, record_error};

#[cfg(test)]
pub(crate) mod testing {
    //! Drives handlers through the registry without a socket.

    use super::{Context, Registry};
    use crate::error::{HandlerError, HandlerResult};
    use crate::config::LimitsConfig;
    use crate::state::test_support::matrix_with_limits;
    use crate::state::{ConnectionHandle, Matrix, RegisteredState, UnregisteredState};
    use courier_proto::{Command, Reply};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::sync::mpsc::Receiver;

    pub struct Harness {
        pub matrix: Arc<Matrix>,
        registry: Registry,
        addr: SocketAddr,
    }

    /// A registered session as seen by the handlers.
    pub struct Peer {
        pub state: RegisteredState,
        pub handle: ConnectionHandle,
        rx: Receiver<Arc<Reply>>,
    }

    impl Peer {
        /// Lines other sessions queued for this peer since the last call.
        pub fn inbox(&mut self) -> Vec<String> {
            let mut lines = Vec::new();
            while let Ok(reply) = self.rx.try_recv() {
                lines.push(reply.to_string());
            }
            lines
        }
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_mailbox(100)
        }

        pub fn with_mailbox(cap: usize) -> Self {
            Self::with_limits(|limits| limits.max_pending_per_recipient = cap)
        }

        pub fn with_limits(tweak: impl FnOnce(&mut LimitsConfig)) -> Self {
            Self {
                matrix: Arc::new(matrix_with_limits(tweak)),
                registry: Registry::new(),
                addr: SocketAddr::from(([127, 0, 0, 1], 40000)),
            }
        }

        fn connect(&self) -> (ConnectionHandle, Receiver<Arc<Reply>>) {
            let session = self.matrix.session_ids.next();
            ConnectionHandle::channel(session, self.matrix.limits.outgoing_queue_capacity)
        }

        /// Attempt registration on a fresh connection.
        pub async fn try_register(&self, name: &str) -> (HandlerResult, Vec<String>) {
            self.try_register_peer(name).await.0
        }

        async fn try_register_peer(
            &self,
            name: &str,
        ) -> ((HandlerResult, Vec<String>), Option<Peer>) {
            let (handle, rx) = self.connect();
            let mut state = UnregisteredState::new();
            let mut replies = Vec::new();
            let cmd = Command::Register(name.to_string());

            let result = {
                let mut ctx =
                    Context::new(&self.matrix, &handle, &mut state, self.addr, &mut replies);
                self.registry.dispatch_pre_reg(&mut ctx, &cmd).await
            };
            let lines = replies.iter().map(ToString::to_string).collect();

            let peer = state
                .try_register()
                .ok()
                .map(|state| Peer { state, handle, rx });
            ((result, lines), peer)
        }

        /// Register `name`, panicking on failure.
        pub async fn register(&self, name: &str) -> Peer {
            self.register_with_replies(name).await.0
        }

        /// Register `name` and keep the registration replies (welcome and
        /// offline backlog).
        pub async fn register_with_replies(&self, name: &str) -> (Peer, Vec<String>) {
            let ((result, lines), peer) = self.try_register_peer(name).await;
            result.expect("registration should succeed");
            (peer.expect("registered state"), lines)
        }

        /// Parse and dispatch `line` for `peer`, returning the result and
        /// the replies addressed to `peer` itself.
        pub async fn run_collect(&self, peer: &mut Peer, line: &str) -> (HandlerResult, Vec<String>) {
            let cmd = match line.parse::<Command>() {
                Ok(cmd) => cmd,
                Err(e) => return (Err(HandlerError::from(e)), Vec::new()),
            };

            let mut replies = Vec::new();
            let result = {
                let mut ctx =
                    Context::new(&self.matrix, &peer.handle, &mut peer.state, self.addr, &mut replies);
                self.registry.dispatch_post_reg(&mut ctx, &cmd).await
            };
            (result, replies.iter().map(ToString::to_string).collect())
        }

        pub async fn run(&self, peer: &mut Peer, line: &str) -> HandlerResult {
            self.run_collect(peer, line).await.0
        }
    }
}
