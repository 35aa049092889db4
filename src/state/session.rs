//! Session state types for typestate enforcement.
//!
//! The state type itself holds the data relevant to that phase, and the
//! transition consumes the old state to produce a new one.
//!
//! ```text
//! ┌─────────────────────┐    try_register()     ┌─────────────────────┐
//! │  UnregisteredState  │ ───────────────────▶  │   RegisteredState   │
//! │  name: Option       │    (consumes self)    │   name: String      │
//! └─────────────────────┘                       └─────────────────────┘
//! ```

use crate::error::DeliveryError;
use crate::state::SessionId;
use courier_proto::Reply;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

// ============================================================================
// ConnectionHandle
// ============================================================================

/// Writable endpoint for one connection.
///
/// Cloned into the identity registry and room directory so other sessions can
/// reach this one. The only receiver is the owning session task, which is the
/// only writer to the socket.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    session: SessionId,
    tx: mpsc::Sender<Arc<Reply>>,
}

impl ConnectionHandle {
    /// Create a handle and the receiving end of its outgoing queue.
    pub fn channel(session: SessionId, capacity: usize) -> (Self, mpsc::Receiver<Arc<Reply>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { session, tx }, rx)
    }

    /// Session that owns this handle.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Queue a reply for the owning session without waiting.
    ///
    /// Safe to call while holding a store lock.
    pub fn deliver(&self, reply: Arc<Reply>) -> Result<(), DeliveryError> {
        self.tx.try_send(reply).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

// ============================================================================
// SessionState trait
// ============================================================================

/// Common interface for both UnregisteredState and RegisteredState.
pub trait SessionState: Send {
    /// The registered name, if any. Always `Some` for RegisteredState.
    fn name(&self) -> Option<&str>;
}

// ============================================================================
// UnregisteredState
// ============================================================================

/// State before `server:register` succeeds.
#[derive(Debug)]
pub struct UnregisteredState {
    /// Name bound by a successful registration, awaiting the transition.
    pub name: Option<String>,
    /// When the connection was accepted.
    pub connected_at: Instant,
}

impl UnregisteredState {
    pub fn new() -> Self {
        Self {
            name: None,
            connected_at: Instant::now(),
        }
    }

    /// Whether the registry has accepted a name for this connection.
    pub fn can_register(&self) -> bool {
        self.name.is_some()
    }

    /// Transition to [`RegisteredState`].
    ///
    /// Returns `Err(self)` if no name has been bound yet.
    pub fn try_register(self) -> Result<RegisteredState, Self> {
        match self.name {
            Some(name) => {
                let now = Instant::now();
                Ok(RegisteredState {
                    name,
                    registered_at: now,
                    last_activity: now,
                })
            }
            None => Err(self),
        }
    }
}

impl Default for UnregisteredState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState for UnregisteredState {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

// ============================================================================
// RegisteredState
// ============================================================================

/// State of a session bound to a name.
#[derive(Debug)]
pub struct RegisteredState {
    /// Registered display name. Guaranteed present.
    pub name: String,
    /// When registration completed.
    pub registered_at: Instant,
    /// Last time a line was received, for idle detection.
    pub last_activity: Instant,
}

impl RegisteredState {
    /// Record inbound activity.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

impl SessionState for RegisteredState {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_register_requires_name() {
        let state = UnregisteredState::new();
        assert!(!state.can_register());
        let state = state.try_register().unwrap_err();

        let mut state = state;
        state.name = Some("alice".into());
        let registered = state.try_register().unwrap();
        assert_eq!(registered.name, "alice");
        assert_eq!(registered.name(), Some("alice"));
    }

    #[tokio::test]
    async fn deliver_reports_full_and_closed() {
        let (handle, mut rx) = ConnectionHandle::channel(SessionId::from_raw(1), 1);

        handle.deliver(Arc::new(Reply::Goodbye)).unwrap();
        assert_eq!(
            handle.deliver(Arc::new(Reply::Goodbye)),
            Err(DeliveryError::QueueFull)
        );

        assert_eq!(*rx.recv().await.unwrap(), Reply::Goodbye);
        drop(rx);
        assert_eq!(
            handle.deliver(Arc::new(Reply::Goodbye)),
            Err(DeliveryError::Closed)
        );
    }
}
