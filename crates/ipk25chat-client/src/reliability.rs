//! Confirmation tracking and retransmission for the datagram transport.
//!
//! Every Auth/Join/Msg/Bye sent over UDP is held here until the server
//! confirms its id. Entries are kept sorted by retransmit deadline so the
//! head is always the next thing to wait for. There is no timer task: the
//! event loop sleeps until [`PendingConfirmations::next_deadline`] and then
//! calls [`PendingConfirmations::on_timeout`], so a retransmission may fire
//! late but never early.

use std::time::Duration;

use ipk25chat_types::{Message, MessageId};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ReliabilityConfig;

/// A sent message awaiting its Confirm.
#[derive(Debug, Clone)]
pub struct PendingConfirmation {
    pub message: Message,
    pub deadline: Instant,
    pub retries_left: u8,
}

/// What [`PendingConfirmations::on_timeout`] decided for the head entry.
#[derive(Debug)]
pub enum Expiry<'a> {
    /// Send this message again; its deadline has been refreshed.
    Retransmit(&'a Message),
    /// The retry budget is spent. The entry has been removed.
    Exhausted(Message),
}

/// Sent-but-unconfirmed messages, ordered by deadline.
#[derive(Debug)]
pub struct PendingConfirmations {
    entries: Vec<PendingConfirmation>,
    timeout: Duration,
    max_retries: u8,
    exhausted: bool,
}

impl PendingConfirmations {
    pub fn new(timeout: Duration, max_retries: u8) -> Self {
        Self {
            entries: Vec::new(),
            timeout,
            max_retries,
            exhausted: false,
        }
    }

    pub fn from_config(config: &ReliabilityConfig) -> Self {
        Self::new(config.timeout(), config.max_retries)
    }

    /// Track `message`, which was just transmitted at `now`.
    pub fn enqueue(&mut self, message: Message, now: Instant) {
        debug!(id = message.id, kind = %message.kind(), "awaiting confirmation");
        self.insert(PendingConfirmation {
            message,
            deadline: now + self.timeout,
            retries_left: self.max_retries,
        });
    }

    fn insert(&mut self, entry: PendingConfirmation) -> usize {
        let pos = self
            .entries
            .partition_point(|e| e.deadline <= entry.deadline);
        self.entries.insert(pos, entry);
        pos
    }

    /// The earliest retransmit deadline, if anything is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.first().map(|e| e.deadline)
    }

    /// Handle the head entry if its deadline has passed.
    ///
    /// Returns `None` when nothing is due yet.
    pub fn on_timeout(&mut self, now: Instant) -> Option<Expiry<'_>> {
        if self.entries.first()?.deadline > now {
            return None;
        }
        let mut entry = self.entries.remove(0);

        if entry.retries_left == 0 {
            warn!(id = entry.message.id, kind = %entry.message.kind(), "retries exhausted");
            self.exhausted = true;
            return Some(Expiry::Exhausted(entry.message));
        }

        entry.retries_left -= 1;
        entry.deadline = now + self.timeout;
        debug!(
            id = entry.message.id,
            kind = %entry.message.kind(),
            retries_left = entry.retries_left,
            "retransmitting"
        );
        let pos = self.insert(entry);
        Some(Expiry::Retransmit(&self.entries[pos].message))
    }

    /// Drop the entry confirmed by `id`. Returns the confirmed message, or
    /// `None` for a duplicate or late Confirm.
    pub fn on_confirm(&mut self, id: MessageId) -> Option<Message> {
        let pos = self.entries.iter().position(|e| e.message.id == id)?;
        let entry = self.entries.remove(pos);
        debug!(id, kind = %entry.message.kind(), "confirmed");
        Some(entry.message)
    }

    /// Whether any message has run out of retries. Stays true once set.
    pub fn has_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingConfirmation> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(250);

    fn queue(retries: u8) -> PendingConfirmations {
        PendingConfirmations::new(TIMEOUT, retries)
    }

    #[test]
    fn three_retries_mean_four_transmissions() {
        let mut pending = queue(3);
        let start = Instant::now();
        pending.enqueue(Message::auth(0, "bob", "Bob", "s3cr3t"), start);

        let mut retransmissions = 0;
        let mut now = start;
        loop {
            now = pending.next_deadline().unwrap();
            match pending.on_timeout(now).unwrap() {
                Expiry::Retransmit(msg) => {
                    assert_eq!(msg.id, 0);
                    retransmissions += 1;
                }
                Expiry::Exhausted(msg) => {
                    assert_eq!(msg.id, 0);
                    break;
                }
            }
        }

        assert_eq!(retransmissions, 3);
        assert_eq!(now, start + TIMEOUT * 4);
        assert!(pending.has_exhausted());
        assert!(pending.is_empty());
    }

    #[test]
    fn nothing_fires_before_the_deadline() {
        let mut pending = queue(3);
        let start = Instant::now();
        pending.enqueue(Message::bye(1), start);
        assert!(pending.on_timeout(start).is_none());
        assert!(pending.on_timeout(start + TIMEOUT - Duration::from_millis(1)).is_none());
        assert!(pending.on_timeout(start + TIMEOUT).is_some());
    }

    #[test]
    fn head_is_earliest_deadline() {
        let mut pending = queue(3);
        let start = Instant::now();
        pending.enqueue(Message::msg(1, "a", "first"), start);
        pending.enqueue(Message::msg(2, "a", "second"), start + Duration::from_millis(10));

        // Retransmitting id 1 pushes it behind id 2.
        let now = start + TIMEOUT;
        match pending.on_timeout(now) {
            Some(Expiry::Retransmit(msg)) => assert_eq!(msg.id, 1),
            other => panic!("expected retransmit, got {other:?}"),
        }
        let order: Vec<_> = pending.iter().map(|e| e.message.id).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(pending.next_deadline(), Some(start + Duration::from_millis(10) + TIMEOUT));
    }

    #[test]
    fn confirm_removes_exactly_one_matching_entry() {
        let mut pending = queue(3);
        let now = Instant::now();
        pending.enqueue(Message::msg(1, "a", "x"), now);
        pending.enqueue(Message::msg(2, "a", "y"), now);

        assert_eq!(pending.on_confirm(2).map(|m| m.id), Some(2));
        assert_eq!(pending.len(), 1);
        // Duplicate and unknown confirms are no-ops.
        assert!(pending.on_confirm(2).is_none());
        assert!(pending.on_confirm(99).is_none());
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.iter().next().unwrap().message.id, 1);
    }

    #[test]
    fn confirmed_entry_never_exhausts() {
        let mut pending = queue(0);
        let now = Instant::now();
        pending.enqueue(Message::bye(5), now);
        assert!(pending.on_confirm(5).is_some());
        assert!(pending.on_timeout(now + TIMEOUT * 10).is_none());
        assert!(!pending.has_exhausted());
    }

    #[test]
    fn zero_retries_fail_after_first_timeout() {
        let mut pending = queue(0);
        let now = Instant::now();
        pending.enqueue(Message::join(3, "general", "Bob"), now);
        assert!(matches!(
            pending.on_timeout(now + TIMEOUT),
            Some(Expiry::Exhausted(_))
        ));
        assert!(pending.has_exhausted());
    }

    #[test]
    fn empty_queue_has_no_deadline() {
        let mut pending = queue(3);
        assert_eq!(pending.next_deadline(), None);
        assert!(pending.on_timeout(Instant::now()).is_none());
    }
}
