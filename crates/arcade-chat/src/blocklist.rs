//! Blocked-user set.
//!
//! This is the source of truth consulted at every ingestion point. Pruning
//! of the other stores on membership change is orchestrated by
//! [`crate::controller::ChatController`].

use std::collections::HashSet;

use tracing::debug;

use arcade_shared::UserId;

/// Membership changes produced by [`BlockList::reconcile`], each sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockListDiff {
    pub added: Vec<UserId>,
    pub removed: Vec<UserId>,
}

#[derive(Debug, Clone, Default)]
pub struct BlockList {
    blocked: HashSet<UserId>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the peer was not already blocked.
    pub fn block(&mut self, peer: UserId) -> bool {
        let added = self.blocked.insert(peer);
        if added {
            debug!(peer = %peer, "Peer blocked");
        }
        added
    }

    /// Returns `true` if the peer was blocked.
    pub fn unblock(&mut self, peer: UserId) -> bool {
        let removed = self.blocked.remove(&peer);
        if removed {
            debug!(peer = %peer, "Peer unblocked");
        }
        removed
    }

    pub fn is_blocked(&self, peer: UserId) -> bool {
        self.blocked.contains(&peer)
    }

    /// Replace the whole set with a server snapshot.
    pub fn reconcile<I>(&mut self, snapshot: I) -> BlockListDiff
    where
        I: IntoIterator<Item = UserId>,
    {
        let next: HashSet<UserId> = snapshot.into_iter().collect();
        let mut added: Vec<UserId> = next.difference(&self.blocked).copied().collect();
        let mut removed: Vec<UserId> = self.blocked.difference(&next).copied().collect();
        added.sort();
        removed.sort();
        debug!(
            total = next.len(),
            added = added.len(),
            removed = removed.len(),
            "Block list reconciled"
        );
        self.blocked = next;
        BlockListDiff { added, removed }
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}
