//! Per-peer unread counters.
//!
//! The aggregate total is never assigned directly: every mutation ends with
//! [`UnreadTracker::recompute_total`], a fold over the entries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use arcade_shared::{UnreadSnapshot, UserId};

use crate::blocklist::BlockList;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadEntry {
    pub peer_id: UserId,
    pub username: String,
    pub count: u32,
    pub last_message_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct UnreadTracker {
    entries: HashMap<UserId, UnreadEntry>,
    total: u32,
}

impl UnreadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more unread message from `peer`.
    pub fn increment(&mut self, peer: UserId, username: &str, now: DateTime<Utc>) -> u32 {
        let entry = self.entries.entry(peer).or_insert_with(|| UnreadEntry {
            peer_id: peer,
            username: username.to_string(),
            count: 0,
            last_message_time: None,
        });
        entry.count = entry.count.saturating_add(1);
        entry.last_message_time = Some(now);
        if !username.is_empty() {
            entry.username = username.to_string();
        }
        let count = entry.count;
        self.recompute_total();
        count
    }

    /// Drop the peer's entry. Returns the count it held, or `None` if there
    /// was nothing to clear.
    pub fn mark_read(&mut self, peer: UserId) -> Option<u32> {
        let removed = self.entries.remove(&peer).map(|e| e.count);
        if let Some(count) = removed {
            debug!(peer = %peer, count, "Conversation marked read");
            self.recompute_total();
        }
        removed
    }

    /// Remove a peer without logging it as read (block pruning).
    pub fn remove_peer(&mut self, peer: UserId) {
        if self.entries.remove(&peer).is_some() {
            self.recompute_total();
        }
    }

    /// Replace every entry with the server's view, skipping blocked peers and
    /// zero counts.
    pub fn reconcile(&mut self, snapshot: &UnreadSnapshot, blocklist: &BlockList) {
        self.entries = snapshot
            .conversations
            .iter()
            .filter(|c| c.count > 0 && !blocklist.is_blocked(c.peer_id))
            .map(|c| {
                (
                    c.peer_id,
                    UnreadEntry {
                        peer_id: c.peer_id,
                        username: c.username.clone(),
                        count: c.count,
                        last_message_time: c.last_message_time,
                    },
                )
            })
            .collect();
        self.recompute_total();

        if self.total != snapshot.total_unread_count {
            debug!(
                local = self.total,
                server = snapshot.total_unread_count,
                "Server total differs from per-peer sum"
            );
        }
    }

    pub fn recompute_total(&mut self) -> u32 {
        self.total = self
            .entries
            .values()
            .fold(0u32, |acc, e| acc.saturating_add(e.count));
        self.total
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn count(&self, peer: UserId) -> u32 {
        self.entries.get(&peer).map_or(0, |e| e.count)
    }

    pub fn entry(&self, peer: UserId) -> Option<&UnreadEntry> {
        self.entries.get(&peer)
    }

    pub fn entries(&self) -> impl Iterator<Item = &UnreadEntry> {
        self.entries.values()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recompute_total();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_shared::UnreadCount;

    fn sum(tracker: &UnreadTracker) -> u32 {
        tracker.entries().map(|e| e.count).sum()
    }

    #[test]
    fn test_increment_creates_entry_lazily() {
        let mut tracker = UnreadTracker::new();
        assert!(tracker.entry(UserId(7)).is_none());

        assert_eq!(tracker.increment(UserId(7), "bob", Utc::now()), 1);
        assert_eq!(tracker.increment(UserId(7), "bob", Utc::now()), 2);
        tracker.increment(UserId(8), "eve", Utc::now());

        assert_eq!(tracker.count(UserId(7)), 2);
        assert_eq!(tracker.total(), 3);
        assert_eq!(tracker.total(), sum(&tracker));
        assert!(tracker.entry(UserId(7)).unwrap().last_message_time.is_some());
    }

    #[test]
    fn test_mark_read_exact_and_idempotent() {
        let mut tracker = UnreadTracker::new();
        tracker.increment(UserId(7), "bob", Utc::now());
        tracker.increment(UserId(7), "bob", Utc::now());
        tracker.increment(UserId(8), "eve", Utc::now());

        assert_eq!(tracker.mark_read(UserId(7)), Some(2));
        assert_eq!(tracker.total(), 1);
        assert_eq!(tracker.count(UserId(8)), 1);

        assert_eq!(tracker.mark_read(UserId(7)), None);
        assert_eq!(tracker.total(), 1);
        assert_eq!(tracker.total(), sum(&tracker));
    }

    #[test]
    fn test_reconcile_replaces_everything() {
        let mut tracker = UnreadTracker::new();
        tracker.increment(UserId(1), "old", Utc::now());

        let mut blocklist = BlockList::new();
        blocklist.block(UserId(9));

        let snapshot = UnreadSnapshot {
            total_unread_count: 99,
            conversations: vec![
                UnreadCount { peer_id: UserId(7), username: "bob".into(), count: 2, last_message_time: None },
                UnreadCount { peer_id: UserId(8), username: "eve".into(), count: 0, last_message_time: None },
                UnreadCount { peer_id: UserId(9), username: "mal".into(), count: 4, last_message_time: None },
            ],
        };
        tracker.reconcile(&snapshot, &blocklist);

        assert!(tracker.entry(UserId(1)).is_none());
        assert!(tracker.entry(UserId(8)).is_none());
        assert!(tracker.entry(UserId(9)).is_none());
        assert_eq!(tracker.count(UserId(7)), 2);
        assert_eq!(tracker.total(), 2);
    }

    #[test]
    fn test_remove_peer_and_clear() {
        let mut tracker = UnreadTracker::new();
        tracker.increment(UserId(7), "bob", Utc::now());
        tracker.increment(UserId(8), "eve", Utc::now());

        tracker.remove_peer(UserId(7));
        assert_eq!(tracker.total(), 1);

        tracker.clear();
        assert_eq!(tracker.total(), 0);
    }
}
