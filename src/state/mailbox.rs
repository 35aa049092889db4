//! Offline mailbox: undelivered directed messages keyed by recipient name.

use crate::error::HandlerError;
use chrono::{DateTime, Utc};
use courier_proto::Reply;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A directed message held for a recipient that was not online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub sender: String,
    pub body: String,
    pub queued_at: DateTime<Utc>,
}

impl PendingMessage {
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            queued_at: Utc::now(),
        }
    }

    /// The delivery line the recipient sees, identical to a live forward.
    pub fn into_reply(self) -> Reply {
        Reply::Direct {
            sender: self.sender,
            body: self.body,
        }
    }

    /// Recover a directed message from a forward that never reached its socket.
    pub fn from_reply(reply: &Reply) -> Option<Self> {
        match reply {
            Reply::Direct { sender, body } => Some(Self::new(sender.as_str(), body.as_str())),
            _ => None,
        }
    }
}

/// Per-recipient FIFO queues with a fixed cap.
///
/// When a queue is full new messages are rejected, never evicted. The number
/// of queues is capped too, so messages to many never-seen names cannot grow
/// the map without bound.
pub struct OfflineMailbox {
    queues: DashMap<String, VecDeque<PendingMessage>>,
    /// Live queue count. Bumped under the vacant entry's shard lock and
    /// dropped after removal, so it never undercounts.
    queued_recipients: AtomicUsize,
    capacity: usize,
    max_recipients: usize,
}

impl OfflineMailbox {
    /// Create a mailbox holding at most `capacity` messages for each of at
    /// most `max_recipients` names.
    pub fn new(capacity: usize, max_recipients: usize) -> Self {
        Self {
            queues: DashMap::new(),
            queued_recipients: AtomicUsize::new(0),
            capacity,
            max_recipients,
        }
    }

    /// Append a message to `recipient`'s queue.
    ///
    /// Returns the queue length after the append.
    pub fn enqueue(&self, recipient: &str, message: PendingMessage) -> Result<usize, HandlerError> {
        if self.capacity == 0 {
            return Err(HandlerError::MailboxFull(recipient.to_string()));
        }

        match self.queues.entry(recipient.to_string()) {
            Entry::Occupied(mut entry) => {
                let queue = entry.get_mut();
                if queue.len() >= self.capacity {
                    return Err(HandlerError::MailboxFull(recipient.to_string()));
                }
                queue.push_back(message);
                Ok(queue.len())
            }
            Entry::Vacant(entry) => {
                let reserved = self.queued_recipients.fetch_update(
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                    |n| (n < self.max_recipients).then_some(n + 1),
                );
                if reserved.is_err() {
                    return Err(HandlerError::MailboxFull(recipient.to_string()));
                }
                entry.insert(VecDeque::from([message]));
                Ok(1)
            }
        }
    }

    /// Remove and return everything queued for `recipient`, oldest first.
    pub fn drain(&self, recipient: &str) -> Vec<PendingMessage> {
        match self.queues.remove(recipient) {
            Some((_, queue)) => {
                self.queued_recipients.fetch_sub(1, Ordering::Relaxed);
                queue.into()
            }
            None => Vec::new(),
        }
    }

    /// Number of recipients with at least one waiting message.
    pub fn recipients(&self) -> usize {
        self.queued_recipients.load(Ordering::Relaxed)
    }

    /// Number of messages waiting for `recipient`.
    #[cfg(test)]
    pub fn pending(&self, recipient: &str) -> usize {
        self.queues.get(recipient).map_or(0, |q| q.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_fifo_and_empties() {
        let mailbox = OfflineMailbox::new(10, 100);
        mailbox.enqueue("bob", PendingMessage::new("alice", "one")).unwrap();
        mailbox.enqueue("bob", PendingMessage::new("carol", "two")).unwrap();
        mailbox.enqueue("bob", PendingMessage::new("alice", "three")).unwrap();
        assert_eq!(mailbox.pending("bob"), 3);

        let bodies: Vec<_> = mailbox.drain("bob").into_iter().map(|m| m.body).collect();
        assert_eq!(bodies, ["one", "two", "three"]);

        assert_eq!(mailbox.pending("bob"), 0);
        assert!(mailbox.drain("bob").is_empty());
        assert_eq!(mailbox.recipients(), 0);
    }

    #[test]
    fn queues_are_per_recipient() {
        let mailbox = OfflineMailbox::new(10, 100);
        mailbox.enqueue("bob", PendingMessage::new("alice", "for bob")).unwrap();
        mailbox.enqueue("carol", PendingMessage::new("alice", "for carol")).unwrap();

        let drained = mailbox.drain("bob");
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].body, "for bob");
        assert_eq!(mailbox.pending("carol"), 1);
    }

    #[test]
    fn full_queue_rejects_new_and_keeps_old() {
        let mailbox = OfflineMailbox::new(2, 100);
        assert_eq!(mailbox.enqueue("bob", PendingMessage::new("a", "1")).unwrap(), 1);
        assert_eq!(mailbox.enqueue("bob", PendingMessage::new("a", "2")).unwrap(), 2);

        let err = mailbox.enqueue("bob", PendingMessage::new("a", "3")).unwrap_err();
        assert!(matches!(err, HandlerError::MailboxFull(ref name) if name == "bob"));

        let bodies: Vec<_> = mailbox.drain("bob").into_iter().map(|m| m.body).collect();
        assert_eq!(bodies, ["1", "2"]);
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let mailbox = OfflineMailbox::new(0, 100);
        assert!(mailbox.enqueue("bob", PendingMessage::new("a", "1")).is_err());
        assert_eq!(mailbox.recipients(), 0);
    }

    #[test]
    fn recipient_cap_rejects_new_names_only() {
        let mailbox = OfflineMailbox::new(5, 2);
        mailbox.enqueue("bob", PendingMessage::new("a", "1")).unwrap();
        mailbox.enqueue("carol", PendingMessage::new("a", "2")).unwrap();

        let err = mailbox.enqueue("dave", PendingMessage::new("a", "3")).unwrap_err();
        assert!(matches!(err, HandlerError::MailboxFull(ref name) if name == "dave"));
        assert_eq!(mailbox.enqueue("bob", PendingMessage::new("a", "4")).unwrap(), 2);
        assert_eq!(mailbox.recipients(), 2);

        mailbox.drain("carol");
        assert_eq!(mailbox.recipients(), 1);
        assert_eq!(mailbox.enqueue("dave", PendingMessage::new("a", "5")).unwrap(), 1);
    }

    #[test]
    fn only_direct_replies_are_recoverable() {
        let direct = Reply::Direct { sender: "alice".into(), body: "hi".into() };
        let recovered = PendingMessage::from_reply(&direct).unwrap();
        assert_eq!((recovered.sender.as_str(), recovered.body.as_str()), ("alice", "hi"));

        assert!(PendingMessage::from_reply(&Reply::Saved { recipient: "bob".into() }).is_none());
    }

    #[test]
    fn pending_message_renders_as_direct() {
        let reply = PendingMessage::new("alice", "hi").into_reply();
        assert_eq!(reply.to_string(), "alice: hi");
    }
}
