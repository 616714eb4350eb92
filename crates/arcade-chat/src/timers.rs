//! Scheduled-task bookkeeping for timer-driven components.
//!
//! A [`Timers`] set never sleeps on its own. Owners schedule keyed
//! deadlines, cancel them by handle, and collect whatever is due when the
//! runtime polls with the current time. This keeps every timer chain
//! deterministic under a [`crate::clock::ManualClock`].

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Identifies one scheduled deadline. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
pub struct Timers<K> {
    next_id: u64,
    /// Ordered by (deadline, id) so equal deadlines fire in schedule order.
    queue: BTreeMap<(Instant, u64), K>,
    deadlines: HashMap<u64, Instant>,
}

impl<K> Timers<K> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, key: K) -> TimerHandle {
        self.schedule_at(now + delay, key)
    }

    pub fn schedule_at(&mut self, deadline: Instant, key: K) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.insert((deadline, id), key);
        self.deadlines.insert(id, deadline);
        TimerHandle(id)
    }

    /// Cancel a pending timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle.0) {
            Some(deadline) => self.queue.remove(&(deadline, handle.0)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle.0)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return every timer whose deadline is at or before `now`,
    /// earliest first.
    pub fn pop_due(&mut self, now: Instant) -> Vec<K> {
        let mut due = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let ((_, id), key) = entry.remove_entry();
            self.deadlines.remove(&id);
            due.push(key);
        }
        due
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.deadlines.clear();
    }
}

impl<K> Default for Timers<K> {
    fn default() -> Self {
        Self::new()
    }
}
