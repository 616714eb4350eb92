use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// User identity = numeric account id assigned by the server
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Global,
    Private,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    GameInvite,
    TournamentAnnouncement,
    TournamentInvite,
}

/// The conversation currently shown to the user. Exactly one is active.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConversationSelection {
    #[default]
    Global,
    Private(UserId),
}

impl ConversationSelection {
    /// The peer of a private selection.
    pub fn peer(&self) -> Option<UserId> {
        match self {
            Self::Global => None,
            Self::Private(peer) => Some(*peer),
        }
    }

    pub fn is_private_with(&self, peer: UserId) -> bool {
        *self == Self::Private(peer)
    }
}

impl std::fmt::Display for ConversationSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Private(peer) => write!(f, "private:{peer}"),
        }
    }
}

/// A chat message as delivered by the transport. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub channel: ChannelType,
    pub sender_id: UserId,
    pub sender_username: String,
    pub recipient_id: Option<UserId>,
    pub content: String,
    pub kind: MessageKind,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// For a private message, the participant that is not `local`.
    ///
    /// Returns `None` when the local user sent the message without naming a
    /// recipient.
    pub fn other_party(&self, local: UserId) -> Option<UserId> {
        if self.sender_id == local {
            self.recipient_id
        } else {
            Some(self.sender_id)
        }
    }
}
