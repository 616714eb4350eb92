//! Fixtures shared by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, TimeZone, Utc};

use arcade_shared::{ChannelType, Message, MessageKind, TransportCommand, UserId};

use crate::error::TransportError;
use crate::transport::Transport;

/// Creation time derived from the id so history pages sort predictably.
fn timestamp(id: u64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + Duration::seconds(id as i64)
}

pub fn global_message(id: u64, sender: u64, content: &str) -> Message {
    Message {
        id: id.to_string(),
        channel: ChannelType::Global,
        sender_id: UserId(sender),
        sender_username: format!("user{sender}"),
        recipient_id: None,
        content: content.to_string(),
        kind: MessageKind::Text,
        metadata: None,
        created_at: timestamp(id),
    }
}

pub fn private_message(id: u64, sender: u64, recipient: u64, content: &str) -> Message {
    Message {
        id: id.to_string(),
        channel: ChannelType::Private,
        sender_id: UserId(sender),
        sender_username: format!("user{sender}"),
        recipient_id: Some(UserId(recipient)),
        content: content.to_string(),
        kind: MessageKind::Text,
        metadata: None,
        created_at: timestamp(id),
    }
}

/// Transport that records commands instead of sending them. Clones share
/// the same log and failure switch.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<TransportCommand>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn take(&self) -> Vec<TransportCommand> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, command: TransportCommand) -> Result<(), TransportError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(TransportError::Closed);
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
        Ok(())
    }
}
