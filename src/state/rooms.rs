//! Room directory: ephemeral named groups with at most one room per identity.
//!
//! Both directions of the membership relation live in one [`RoomTable`]
//! behind one mutex, so a join or leave is a single critical section and the
//! two maps cannot disagree. Notices to other members are queued with
//! [`ConnectionHandle::deliver`], which never waits.

use crate::error::HandlerError;
use crate::state::session::ConnectionHandle;
use courier_proto::Reply;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Result of [`RoomDirectory::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The identity was already a member of the requested room.
    AlreadyMember,
    Joined {
        /// Previous room, left as part of the switch.
        left: Option<Departure>,
        /// Whether the room was created by this join.
        created: bool,
    },
}

/// A completed departure from a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room: String,
    /// Whether the room was deleted because it became empty.
    pub closed: bool,
}

/// Result of [`RoomDirectory::broadcast`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fanout {
    pub room: String,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
struct Room {
    members: BTreeMap<String, ConnectionHandle>,
}

impl Room {
    /// Queue `reply` for every member except `except`. Returns (delivered, failed).
    fn notify_others(&self, except: &str, reply: Reply) -> (usize, usize) {
        let reply = Arc::new(reply);
        let mut delivered = 0;
        let mut failed = 0;
        for (name, handle) in self.members.iter().filter(|(name, _)| name.as_str() != except) {
            match handle.deliver(Arc::clone(&reply)) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(member = %name, error = %e, "Skipping room member");
                    failed += 1;
                }
            }
        }
        (delivered, failed)
    }
}

#[derive(Default)]
struct RoomTable {
    rooms: HashMap<String, Room>,
    memberships: HashMap<String, String>,
}

impl RoomTable {
    fn leave(&mut self, name: &str) -> Option<Departure> {
        let room_name = self.memberships.remove(name)?;
        let Some(room) = self.rooms.get_mut(&room_name) else {
            return Some(Departure {
                room: room_name,
                closed: true,
            });
        };

        room.members.remove(name);
        let closed = room.members.is_empty();
        if closed {
            self.rooms.remove(&room_name);
        } else {
            room.notify_others(
                name,
                Reply::Departed {
                    name: name.to_string(),
                    room: room_name.clone(),
                },
            );
        }

        Some(Departure {
            room: room_name,
            closed,
        })
    }
}

/// Room membership store.
pub struct RoomDirectory {
    table: Mutex<RoomTable>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(RoomTable::default()),
        }
    }

    /// Move `name` into `room`, leaving its current room first.
    pub fn join(&self, name: &str, handle: ConnectionHandle, room: &str) -> JoinOutcome {
        let mut table = self.table.lock();
        if table.memberships.get(name).is_some_and(|current| current == room) {
            return JoinOutcome::AlreadyMember;
        }

        let left = table.leave(name);

        let created = !table.rooms.contains_key(room);
        let entry = table.rooms.entry(room.to_string()).or_default();
        entry.members.insert(name.to_string(), handle);
        entry.notify_others(
            name,
            Reply::Arrived {
                name: name.to_string(),
                room: room.to_string(),
            },
        );
        table.memberships.insert(name.to_string(), room.to_string());

        JoinOutcome::Joined { left, created }
    }

    /// Remove `name` from its room. `None` if it was not in one.
    pub fn leave(&self, name: &str) -> Option<Departure> {
        self.table.lock().leave(name)
    }

    /// Send `text` from `sender` to every other member of the sender's room.
    pub fn broadcast(&self, sender: &str, text: &str) -> Result<Fanout, HandlerError> {
        let table = self.table.lock();
        let room_name = table.memberships.get(sender).ok_or(HandlerError::NoRoom)?;
        let (delivered, failed) = match table.rooms.get(room_name) {
            Some(room) => room.notify_others(sender, Reply::room(sender, room_name.as_str(), text)),
            None => (0, 0),
        };

        Ok(Fanout {
            room: room_name.clone(),
            delivered,
            failed,
        })
    }

    #[cfg(test)]
    pub fn room_of(&self, name: &str) -> Option<String> {
        self.table.lock().memberships.get(name).cloned()
    }

    /// Sorted member names of `room`; empty if the room does not exist.
    #[cfg(test)]
    pub fn members(&self, room: &str) -> Vec<String> {
        self.table
            .lock()
            .rooms
            .get(room)
            .map(|r| r.members.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of rooms that currently exist.
    pub fn len(&self) -> usize {
        self.table.lock().rooms.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.table.lock().rooms.is_empty()
    }
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}
