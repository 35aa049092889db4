//! Identity registry: display name to live connection.
//!
//! Every operation that consults both this registry and the offline mailbox
//! runs with the registry lock held, so a directed message can never be
//! queued for a name after that name's queue was drained at registration.
//! Lock order is always registry first, then mailbox.

use crate::error::HandlerError;
use crate::state::mailbox::{OfflineMailbox, PendingMessage};
use crate::state::session::ConnectionHandle;
use crate::state::SessionId;
use courier_proto::Reply;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of [`IdentityRegistry::route`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Handed to the recipient's connection.
    Delivered,
    /// Stored in the mailbox; `pending` is the recipient's queue length.
    Queued { pending: usize },
}

/// Unique name bindings.
pub struct IdentityRegistry {
    bindings: RwLock<HashMap<String, ConnectionHandle>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Bind `name` to `handle` and drain the name's offline queue.
    ///
    /// Returns the drained messages in enqueue order.
    pub fn register(
        &self,
        name: &str,
        handle: ConnectionHandle,
        mailbox: &OfflineMailbox,
    ) -> Result<Vec<PendingMessage>, HandlerError> {
        let mut bindings = self.bindings.write();
        if bindings.contains_key(name) {
            return Err(HandlerError::NameTaken(name.to_string()));
        }
        bindings.insert(name.to_string(), handle);
        Ok(mailbox.drain(name))
    }

    #[cfg(test)]
    pub fn lookup(&self, name: &str) -> Option<ConnectionHandle> {
        self.bindings.read().get(name).cloned()
    }

    /// Forward a directed message to `recipient`, or queue it if offline.
    pub fn route(
        &self,
        sender: &str,
        recipient: &str,
        body: &str,
        mailbox: &OfflineMailbox,
    ) -> Result<Routed, HandlerError> {
        let bindings = self.bindings.read();
        match bindings.get(recipient) {
            Some(handle) => {
                handle
                    .deliver(Arc::new(Reply::direct(sender, body)))
                    .map_err(|source| HandlerError::DeliveryFailed {
                        recipient: recipient.to_string(),
                        source,
                    })?;
                Ok(Routed::Delivered)
            }
            None => {
                let pending = mailbox.enqueue(recipient, PendingMessage::new(sender, body))?;
                Ok(Routed::Queued { pending })
            }
        }
    }

    /// Sorted snapshot of every registered name.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove `name` if it is still bound to `session`.
    ///
    /// Returns whether a binding was removed.
    pub fn unregister(&self, name: &str, session: SessionId) -> bool {
        let mut bindings = self.bindings.write();
        match bindings.get(name) {
            Some(handle) if handle.session() == session => {
                bindings.remove(name);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
