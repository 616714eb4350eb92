//! In-memory message feeds.
//!
//! The broadcast feed keeps only the most recent messages; private feeds are
//! keyed by peer and sized by whatever history page the server returned plus
//! live deliveries. Every append consults the [`BlockList`] so a blocked
//! sender never reaches a feed.

use std::collections::HashMap;

use tracing::{debug, trace};

use arcade_shared::constants::BROADCAST_CAPACITY;
use arcade_shared::{ConversationSelection, Message, UserId};

use crate::blocklist::BlockList;

#[derive(Debug, Clone)]
pub struct ConversationStore {
    broadcast: Vec<Message>,
    broadcast_capacity: usize,
    private: HashMap<UserId, Vec<Message>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::with_capacity(BROADCAST_CAPACITY)
    }

    /// Capacity is kept within `1..=BROADCAST_CAPACITY`.
    pub fn with_capacity(broadcast_capacity: usize) -> Self {
        let broadcast_capacity = broadcast_capacity.clamp(1, BROADCAST_CAPACITY);
        Self {
            broadcast: Vec::with_capacity(broadcast_capacity),
            broadcast_capacity,
            private: HashMap::new(),
        }
    }

    /// Append to the broadcast feed, evicting the oldest beyond capacity.
    ///
    /// Returns `false` when the sender is blocked and the message was dropped.
    pub fn append_global(&mut self, message: Message, blocklist: &BlockList) -> bool {
        if blocklist.is_blocked(message.sender_id) {
            trace!(sender = %message.sender_id, "Dropping global message from blocked sender");
            return false;
        }

        self.broadcast.push(message);
        if self.broadcast.len() > self.broadcast_capacity {
            let excess = self.broadcast.len() - self.broadcast_capacity;
            self.broadcast.drain(..excess);
        }
        true
    }

    /// Append to a peer's private feed, creating it on first use.
    ///
    /// Returns `false` when the peer or sender is blocked, or when a message
    /// with the same id is already in the feed.
    pub fn append_private(&mut self, peer: UserId, message: Message, blocklist: &BlockList) -> bool {
        if blocklist.is_blocked(peer) || blocklist.is_blocked(message.sender_id) {
            trace!(peer = %peer, "Dropping private message for blocked peer");
            return false;
        }

        let feed = self.private.entry(peer).or_default();
        if feed.iter().any(|m| m.id == message.id) {
            trace!(peer = %peer, id = %message.id, "Duplicate private message ignored");
            return false;
        }
        feed.push(message);
        true
    }

    /// Install a freshly fetched history page for a peer, oldest first.
    pub fn replace_private(&mut self, peer: UserId, mut messages: Vec<Message>, blocklist: &BlockList) {
        if blocklist.is_blocked(peer) {
            self.private.remove(&peer);
            return;
        }

        messages.retain(|m| !blocklist.is_blocked(m.sender_id));
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        debug!(peer = %peer, count = messages.len(), "Private history installed");
        self.private.insert(peer, messages);
    }

    pub fn get_active(&self, selection: ConversationSelection) -> &[Message] {
        match selection {
            ConversationSelection::Global => &self.broadcast,
            ConversationSelection::Private(peer) => {
                self.private.get(&peer).map(Vec::as_slice).unwrap_or(&[])
            }
        }
    }

    pub fn broadcast(&self) -> &[Message] {
        &self.broadcast
    }

    pub fn private_feed(&self, peer: UserId) -> Option<&[Message]> {
        self.private.get(&peer).map(Vec::as_slice)
    }

    /// Remove every trace of a peer: its private feed and any message it sent
    /// in any other feed. Returns the number of messages removed.
    pub fn prune_sender(&mut self, peer: UserId) -> usize {
        let mut removed = self.private.remove(&peer).map_or(0, |feed| feed.len());

        let before = self.broadcast.len();
        self.broadcast.retain(|m| m.sender_id != peer);
        removed += before - self.broadcast.len();

        for feed in self.private.values_mut() {
            let before = feed.len();
            feed.retain(|m| m.sender_id != peer);
            removed += before - feed.len();
        }

        debug!(peer = %peer, removed, "Pruned messages for peer");
        removed
    }

    pub fn clear_peer(&mut self, peer: UserId) {
        self.private.remove(&peer);
    }

    pub fn clear_all(&mut self) {
        self.broadcast.clear();
        self.private.clear();
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{global_message, private_message};

    #[test]
    fn test_broadcast_capacity_keeps_most_recent() {
        let mut store = ConversationStore::new();
        let blocklist = BlockList::new();

        for i in 0..120 {
            assert!(store.append_global(global_message(i, 1 + i % 5, "msg"), &blocklist));
            assert!(store.broadcast().len() <= BROADCAST_CAPACITY);
        }

        let ids: Vec<String> = store.broadcast().iter().map(|m| m.id.clone()).collect();
        let expected: Vec<String> = (70..120).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_oversized_capacity_is_clamped() {
        let mut store = ConversationStore::with_capacity(1_000);
        let blocklist = BlockList::new();

        for i in 0..80 {
            store.append_global(global_message(i, 2, "msg"), &blocklist);
        }
        assert_eq!(store.broadcast().len(), BROADCAST_CAPACITY);
    }

    #[test]
    fn test_blocked_sender_rejected_at_ingestion() {
        let mut store = ConversationStore::new();
        let mut blocklist = BlockList::new();
        blocklist.block(UserId(9));

        assert!(!store.append_global(global_message(1, 9, "spam"), &blocklist));
        assert!(!store.append_private(UserId(9), private_message(2, 9, 1, "hi"), &blocklist));
        assert!(store.broadcast().is_empty());
        assert!(store.private_feed(UserId(9)).is_none());
    }

    #[test]
    fn test_private_feed_created_lazily_and_deduplicated() {
        let mut store = ConversationStore::new();
        let blocklist = BlockList::new();
        assert!(store.private_feed(UserId(7)).is_none());

        assert!(store.append_private(UserId(7), private_message(1, 7, 1, "a"), &blocklist));
        assert!(!store.append_private(UserId(7), private_message(1, 7, 1, "a"), &blocklist));
        assert!(store.append_private(UserId(7), private_message(2, 1, 7, "b"), &blocklist));

        let feed = store.get_active(ConversationSelection::Private(UserId(7)));
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[1].content, "b");
        assert!(store.get_active(ConversationSelection::Private(UserId(8))).is_empty());
    }

    #[test]
    fn test_replace_private_sorts_and_filters() {
        let mut store = ConversationStore::new();
        let mut blocklist = BlockList::new();
        blocklist.block(UserId(4));

        let mut newer = private_message(2, 7, 1, "newer");
        newer.created_at += chrono::Duration::seconds(10);
        let older = private_message(1, 1, 7, "older");
        let blocked = private_message(3, 4, 1, "nope");

        store.replace_private(UserId(7), vec![newer, older, blocked], &blocklist);
        let feed = store.private_feed(UserId(7)).unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].content, "older");
        assert_eq!(feed[1].content, "newer");
    }

    #[test]
    fn test_prune_sender() {
        let mut store = ConversationStore::new();
        let blocklist = BlockList::new();

        store.append_global(global_message(1, 7, "from seven"), &blocklist);
        store.append_global(global_message(2, 3, "from three"), &blocklist);
        for i in 10..13 {
            store.append_private(UserId(7), private_message(i, 7, 1, "dm"), &blocklist);
        }
        store.append_private(UserId(3), private_message(20, 3, 1, "other"), &blocklist);

        assert_eq!(store.prune_sender(UserId(7)), 4);
        assert!(store.private_feed(UserId(7)).is_none());
        assert!(store.broadcast().iter().all(|m| m.sender_id != UserId(7)));
        assert_eq!(store.private_feed(UserId(3)).map(<[Message]>::len), Some(1));
    }

    #[test]
    fn test_clear() {
        let mut store = ConversationStore::new();
        let blocklist = BlockList::new();
        store.append_global(global_message(1, 2, "x"), &blocklist);
        store.append_private(UserId(2), private_message(2, 2, 1, "y"), &blocklist);

        store.clear_peer(UserId(2));
        assert!(store.private_feed(UserId(2)).is_none());
        assert_eq!(store.broadcast().len(), 1);

        store.clear_all();
        assert!(store.broadcast().is_empty());
    }
}
