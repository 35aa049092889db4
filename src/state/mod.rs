//! State management module.
//!
//! Contains the Matrix (shared server state) and the stores it owns.

mod identity;
mod mailbox;
mod rooms;
mod session;
mod uid;

pub use identity::{IdentityRegistry, Routed};
pub use mailbox::{OfflineMailbox, PendingMessage};
pub use rooms::{JoinOutcome, RoomDirectory};
pub use session::{ConnectionHandle, RegisteredState, SessionState, UnregisteredState};
pub use uid::{SessionId, SessionIdGenerator};

use crate::config::{Config, IdleTimeoutsConfig, LimitsConfig};
use crate::error::HandlerError;
use courier_proto::Reply;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// This server's identity information.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    /// Registration and idle timeouts applied to every connection.
    pub idle_timeouts: IdleTimeoutsConfig,
}

/// The Matrix - central shared state.
///
/// Shared as `Arc<Matrix>` by every session. Each store carries its own
/// lock; see the store modules for the lock order.
pub struct Matrix {
    pub identities: IdentityRegistry,
    pub mailbox: OfflineMailbox,
    pub rooms: RoomDirectory,
    pub server_info: ServerInfo,
    pub session_ids: SessionIdGenerator,
    pub limits: LimitsConfig,
}

impl Matrix {
    pub fn new(config: &Config) -> Self {
        Self {
            identities: IdentityRegistry::new(),
            mailbox: OfflineMailbox::new(
                config.limits.max_pending_per_recipient,
                config.limits.max_offline_recipients,
            ),
            rooms: RoomDirectory::new(),
            server_info: ServerInfo {
                name: config.server.name.clone(),
                idle_timeouts: config.server.idle_timeouts.clone(),
            },
            session_ids: SessionIdGenerator::new(),
            limits: config.limits.clone(),
        }
    }

    /// Bind `name` to `handle`, returning messages queued while it was offline.
    pub fn register_session(
        &self,
        name: &str,
        handle: ConnectionHandle,
    ) -> Result<Vec<PendingMessage>, HandlerError> {
        let session = handle.session();
        let pending = self.identities.register(name, handle, &self.mailbox)?;
        crate::metrics::set_connected_sessions(self.identities.len());
        info!(%session, identity = %name, pending = pending.len(), "Registered");
        Ok(pending)
    }

    /// Close a finished session's outgoing queue and return any directed
    /// messages still in it to `name`'s offline queue.
    ///
    /// Once closed, further forwards fail with `Closed` instead of being
    /// accepted and dropped. Room traffic left in the queue is discarded.
    /// Returns how many messages were requeued.
    pub fn reclaim_undelivered(&self, name: &str, outgoing: &mut mpsc::Receiver<Arc<Reply>>) -> usize {
        outgoing.close();

        let mut requeued = 0;
        let mut lost = 0;
        let mut discarded = 0;
        while let Ok(reply) = outgoing.try_recv() {
            let Some(message) = PendingMessage::from_reply(&reply) else {
                discarded += 1;
                continue;
            };
            let sender = message.sender.clone();
            match self.mailbox.enqueue(name, message) {
                Ok(_) => requeued += 1,
                Err(e) => {
                    lost += 1;
                    warn!(identity = %name, %sender, error = %e, "Undelivered message lost");
                }
            }
        }

        if lost > 0 {
            crate::metrics::record_delivery_failures(lost);
        }
        if requeued > 0 || discarded > 0 {
            info!(identity = %name, requeued, discarded, "Reclaimed outgoing queue");
        }
        requeued
    }

    /// Release everything held for a registered session.
    ///
    /// Room departure happens before the name is released so remaining
    /// members never see a message from a name that is free again.
    pub fn teardown_session(&self, name: &str, session: SessionId) {
        if let Some(departure) = self.rooms.leave(name) {
            info!(%session, identity = %name, room = %departure.room, closed = departure.closed, "Left room on disconnect");
            crate::metrics::set_active_rooms(self.rooms.len());
        }
        if self.identities.unregister(name, session) {
            crate::metrics::set_connected_sessions(self.identities.len());
            info!(%session, identity = %name, "Unregistered");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{matrix, matrix_with_mailbox};
    use super::*;

    #[test]
    fn teardown_leaves_room_then_unregisters() {
        let matrix = matrix();
        let (a, _rx_a) = ConnectionHandle::channel(SessionId::from_raw(1), 8);
        let (b, mut rx_b) = ConnectionHandle::channel(SessionId::from_raw(2), 8);
        matrix.register_session("alice", a.clone()).unwrap();
        matrix.register_session("bob", b.clone()).unwrap();
        matrix.rooms.join("alice", a, "lounge");
        matrix.rooms.join("bob", b, "lounge");

        matrix.teardown_session("alice", SessionId::from_raw(1));

        assert_eq!(matrix.identities.list(), ["bob"]);
        assert_eq!(matrix.rooms.members("lounge"), ["bob"]);
        assert_eq!(rx_b.try_recv().unwrap().to_string(), "* alice left lounge");
    }

    #[test]
    fn teardown_is_idempotent() {
        let matrix = matrix();
        let (a, _rx_a) = ConnectionHandle::channel(SessionId::from_raw(1), 8);
        matrix.register_session("alice", a).unwrap();

        matrix.teardown_session("alice", SessionId::from_raw(1));
        matrix.teardown_session("alice", SessionId::from_raw(1));
        assert!(matrix.identities.is_empty());
    }

    #[test]
    fn reclaim_requeues_direct_messages_and_closes_queue() {
        let matrix = matrix();
        let (a, mut rx_a) = ConnectionHandle::channel(SessionId::from_raw(1), 8);
        matrix.register_session("alice", a.clone()).unwrap();
        a.deliver(Arc::new(Reply::direct("bob", "first"))).unwrap();
        a.deliver(Arc::new(Reply::room("carol", "lounge", "hello"))).unwrap();
        a.deliver(Arc::new(Reply::direct("carol", "second"))).unwrap();

        assert_eq!(matrix.reclaim_undelivered("alice", &mut rx_a), 2);

        // Still bound but closed: a late forward is refused, not swallowed.
        let late = matrix.identities.route("bob", "alice", "late", &matrix.mailbox);
        assert!(matches!(late, Err(HandlerError::DeliveryFailed { .. })));

        matrix.teardown_session("alice", SessionId::from_raw(1));
        let (b, _rx_b) = ConnectionHandle::channel(SessionId::from_raw(2), 8);
        let pending = matrix.register_session("alice", b).unwrap();
        let lines: Vec<_> = pending.into_iter().map(|m| m.into_reply().to_string()).collect();
        assert_eq!(lines, ["bob: first", "carol: second"]);
    }

    #[test]
    fn reclaim_reports_loss_when_mailbox_full() {
        let matrix = matrix_with_mailbox(1);
        let (a, mut rx_a) = ConnectionHandle::channel(SessionId::from_raw(1), 8);
        a.deliver(Arc::new(Reply::direct("bob", "kept"))).unwrap();
        a.deliver(Arc::new(Reply::direct("bob", "lost"))).unwrap();

        assert_eq!(matrix.reclaim_undelivered("alice", &mut rx_a), 1);
        assert_eq!(matrix.mailbox.pending("alice"), 1);
    }

    #[test]
    fn name_is_reusable_after_teardown() {
        let matrix = matrix();
        let (a, _rx_a) = ConnectionHandle::channel(SessionId::from_raw(1), 8);
        let (b, _rx_b) = ConnectionHandle::channel(SessionId::from_raw(2), 8);
        matrix.register_session("alice", a).unwrap();
        matrix.teardown_session("alice", SessionId::from_raw(1));

        assert!(matrix.register_session("alice", b).is_ok());
    }
}
