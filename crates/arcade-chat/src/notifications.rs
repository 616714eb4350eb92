//! Notification list held for the notification badge.

use tracing::debug;

use arcade_shared::{Notification, NotificationList};

#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    notifications: Vec<Notification>,
    unread_count: u32,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, list: NotificationList) {
        debug!(
            total = list.notifications.len(),
            unread = list.unread_count,
            "Notification list replaced"
        );
        self.notifications = list.notifications;
        self.unread_count = list.unread_count;
    }

    /// Optimistically mark one notification read. Returns `true` if it was unread.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.notifications.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.is_read => {
                n.is_read = true;
                self.unread_count = self.unread_count.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.notifications {
            n.is_read = true;
        }
        self.unread_count = 0;
    }

    pub fn unread_count(&self) -> u32 {
        self.unread_count
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }
}
