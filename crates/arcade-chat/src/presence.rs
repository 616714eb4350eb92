//! Online-user tracking.
//!
//! Maintains an in-memory map of users the server reports as online,
//! refreshed wholesale from the full list and incrementally from single
//! status updates.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use arcade_shared::{PresenceUser, UserId};

/// A user currently reported online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineUser {
    pub user_id: UserId,
    pub username: String,
    /// When this client first saw the user online.
    pub online_since: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    users: HashMap<UserId, OnlineUser>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the online set with a full list from the server.
    ///
    /// Users already known keep their `online_since`.
    pub fn replace_all(&mut self, users: &[PresenceUser], now: DateTime<Utc>) {
        let mut next = HashMap::with_capacity(users.len());
        for user in users.iter().filter(|u| u.is_online) {
            let online_since = self
                .users
                .get(&user.id)
                .map_or(now, |existing| existing.online_since);
            next.insert(
                user.id,
                OnlineUser {
                    user_id: user.id,
                    username: user.username.clone(),
                    online_since,
                },
            );
        }
        debug!(online = next.len(), "Presence list replaced");
        self.users = next;
    }

    /// Apply a single status change. Returns `true` if the online set changed.
    pub fn upsert(&mut self, user: &PresenceUser, now: DateTime<Utc>) -> bool {
        if !user.is_online {
            let removed = self.users.remove(&user.id).is_some();
            if removed {
                debug!(user = %user.id, "User went offline");
            }
            return removed;
        }

        match self.users.get_mut(&user.id) {
            Some(existing) => {
                existing.username = user.username.clone();
                false
            }
            None => {
                debug!(user = %user.id, "User came online");
                self.users.insert(
                    user.id,
                    OnlineUser {
                        user_id: user.id,
                        username: user.username.clone(),
                        online_since: now,
                    },
                );
                true
            }
        }
    }

    pub fn is_online(&self, user: UserId) -> bool {
        self.users.contains_key(&user)
    }

    pub fn get(&self, user: UserId) -> Option<&OnlineUser> {
        self.users.get(&user)
    }

    /// Online user ids, sorted.
    pub fn online_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.users.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, online: bool) -> PresenceUser {
        PresenceUser {
            id: UserId(id),
            username: format!("user{id}"),
            is_online: online,
        }
    }

    #[test]
    fn test_replace_all_skips_offline_and_keeps_since() {
        let mut presence = PresenceTracker::new();
        let early = Utc::now() - chrono::Duration::minutes(5);
        presence.replace_all(&[user(1, true)], early);

        let now = Utc::now();
        presence.replace_all(&[user(1, true), user(2, true), user(3, false)], now);

        assert_eq!(presence.online_ids(), vec![UserId(1), UserId(2)]);
        assert_eq!(presence.get(UserId(1)).unwrap().online_since, early);
        assert_eq!(presence.get(UserId(2)).unwrap().online_since, now);
    }

    #[test]
    fn test_upsert() {
        let mut presence = PresenceTracker::new();
        let now = Utc::now();

        assert!(presence.upsert(&user(4, true), now));
        assert!(!presence.upsert(&user(4, true), now));
        assert!(presence.is_online(UserId(4)));

        assert!(presence.upsert(&user(4, false), now));
        assert!(!presence.upsert(&user(4, false), now));
        assert_eq!(presence.count(), 0);
    }
}
