use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::constants::*;
use crate::error::ProtocolError;
use crate::friends::FriendshipUpdate;
use crate::types::{ChannelType, Message, MessageKind, UserId};

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

/// All events the transport pushes to the chat core, one variant per tag.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// Broadcast chat message (including tournament announcements)
    GlobalMessage(Message),
    /// One-to-one message, either direction
    PrivateMessage(Message),
    /// Remote game challenge
    GameInvitation(GameInvitation),
    /// Remote typing start/stop
    Typing(TypingUpdate),
    /// Authoritative per-peer unread counts
    UnreadSnapshot(UnreadSnapshot),
    /// Full notification list
    Notifications(NotificationList),
    /// Full list of online users
    OnlineUsers(Vec<PresenceUser>),
    /// Single presence change
    UserStatus(PresenceUser),
    /// Friend list change, normalised
    Friendship(FriendshipUpdate),
    /// A known tag whose payload failed validation
    Malformed { event: String, reason: String },
    /// A tag this client does not handle
    Unrecognized(String),
}

impl InboundEvent {
    /// Decode a tagged transport payload.
    ///
    /// Never fails: payloads that do not validate become [`InboundEvent::Malformed`].
    pub fn parse(event: &str, payload: Value) -> Self {
        match Self::try_parse(event, payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(event, error = %e, "Rejected inbound payload");
                Self::Malformed {
                    event: event.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn try_parse(event: &str, payload: Value) -> Result<Self, ProtocolError> {
        let parsed = match event {
            EVENT_GLOBAL_MESSAGE => {
                let raw: MessagePayload = decode(event, payload)?;
                Self::GlobalMessage(raw.into_message(ChannelType::Global))
            }
            EVENT_TOURNAMENT_ANNOUNCEMENT => {
                let mut raw: MessagePayload = decode(event, payload)?;
                raw.kind = MessageKind::TournamentAnnouncement;
                Self::GlobalMessage(raw.into_message(ChannelType::Global))
            }
            EVENT_PRIVATE_MESSAGE => {
                let raw: MessagePayload = decode(event, payload)?;
                Self::PrivateMessage(raw.into_message(ChannelType::Private))
            }
            EVENT_GAME_INVITATION => Self::GameInvitation(decode(event, payload)?),
            EVENT_TYPING_INDICATOR => Self::Typing(decode(event, payload)?),
            EVENT_UNREAD_COUNT_UPDATE => Self::UnreadSnapshot(decode(event, payload)?),
            EVENT_NOTIFICATIONS_UPDATE => Self::Notifications(decode(event, payload)?),
            EVENT_ONLINE_USERS => {
                let list: OnlineUsersPayload = decode(event, payload)?;
                Self::OnlineUsers(list.users)
            }
            EVENT_USER_STATUS_UPDATE => {
                let status: UserStatusPayload = decode(event, payload)?;
                Self::UserStatus(status.user)
            }
            EVENT_FRIENDSHIP_UPDATE => Self::Friendship(FriendshipUpdate::from_value(&payload)?),
            other => Self::Unrecognized(other.to_string()),
        };
        Ok(parsed)
    }

    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GlobalMessage(_) => EVENT_GLOBAL_MESSAGE,
            Self::PrivateMessage(_) => EVENT_PRIVATE_MESSAGE,
            Self::GameInvitation(_) => EVENT_GAME_INVITATION,
            Self::Typing(_) => EVENT_TYPING_INDICATOR,
            Self::UnreadSnapshot(_) => EVENT_UNREAD_COUNT_UPDATE,
            Self::Notifications(_) => EVENT_NOTIFICATIONS_UPDATE,
            Self::OnlineUsers(_) => EVENT_ONLINE_USERS,
            Self::UserStatus(_) => EVENT_USER_STATUS_UPDATE,
            Self::Friendship(_) => EVENT_FRIENDSHIP_UPDATE,
            Self::Malformed { .. } => "malformed",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

/// `{ "event": "...", "payload": { ... } }` as framed by the socket layer.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl EventEnvelope {
    pub fn into_event(self) -> InboundEvent {
        InboundEvent::parse(&self.event, self.payload)
    }
}

fn decode<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|source| ProtocolError::Payload {
        event: event.to_string(),
        source,
    })
}

/// Server ids arrive either as JSON numbers or strings.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// Raw chat message as it appears in event payloads and history pages.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub sender_id: UserId,
    #[serde(default)]
    pub sender_username: String,
    #[serde(default)]
    pub recipient_id: Option<UserId>,
    pub content: String,
    #[serde(default, rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl MessagePayload {
    pub fn into_message(self, channel: ChannelType) -> Message {
        Message {
            id: self.id,
            channel,
            sender_id: self.sender_id,
            sender_username: self.sender_username,
            recipient_id: self.recipient_id,
            content: self.content,
            kind: self.kind,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInvitation {
    pub sender_id: UserId,
    #[serde(default)]
    pub sender_username: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingUpdate {
    #[serde(alias = "userId")]
    pub peer_id: UserId,
    #[serde(default)]
    pub username: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadSnapshot {
    /// Server-side total. Informational only: the local total is always
    /// recomputed from the per-peer counts.
    #[serde(default)]
    pub total_unread_count: u32,
    #[serde(default, alias = "unreadCounts")]
    pub conversations: Vec<UnreadCount>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    #[serde(alias = "userId")]
    pub peer_id: UserId,
    #[serde(default)]
    pub username: String,
    pub count: u32,
    #[serde(default)]
    pub last_message_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PresenceUser {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_online")]
    pub is_online: bool,
}

fn default_online() -> bool {
    true
}

#[derive(Deserialize)]
struct OnlineUsersPayload {
    #[serde(default)]
    users: Vec<PresenceUser>,
}

#[derive(Deserialize)]
struct UserStatusPayload {
    user: PresenceUser,
}

/// Tournament invite details carried in a message's metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentInvite {
    #[serde(deserialize_with = "id_string")]
    pub tournament_id: String,
    #[serde(default)]
    pub tournament_name: Option<String>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
}

impl TournamentInvite {
    /// Extract invite details from a tournament-invite message.
    ///
    /// Metadata may be an object or a JSON-encoded string. Anything that does
    /// not parse yields `None` so callers render the message without it.
    pub fn from_message(message: &Message) -> Option<Self> {
        if message.kind != MessageKind::TournamentInvite {
            return None;
        }
        let metadata = message.metadata.as_ref()?;
        let parsed = match metadata {
            Value::String(raw) => serde_json::from_str::<Self>(raw),
            other => Self::deserialize(other),
        };
        match parsed {
            Ok(invite) => Some(invite),
            Err(e) => {
                debug!(message = %message.id, error = %e, "Ignoring unparsable tournament invite metadata");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound commands and request responses
// ---------------------------------------------------------------------------

/// Calls the chat core makes on the transport. Fire-and-forget: request
/// variants are answered later with a [`TransportResponse`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TransportCommand {
    SendGlobalMessage {
        content: String,
        kind: MessageKind,
    },
    SendPrivateMessage {
        peer_id: UserId,
        content: String,
        kind: MessageKind,
    },
    SendTypingIndicator {
        peer_id: UserId,
        is_typing: bool,
    },
    RequestOnlineUsers,
    MarkNotificationRead {
        notification_id: String,
    },
    MarkAllNotificationsRead,
    CreateRemoteGame {
        peer_id: UserId,
    },
    DeclineChallenge {
        peer_id: UserId,
    },
    BlockUser {
        peer_id: UserId,
    },
    UnblockUser {
        peer_id: UserId,
    },
    FetchBlockedUsers,
    FetchUnreadCounts,
    FetchHistory {
        peer_id: UserId,
        limit: u32,
    },
    MarkConversationRead {
        peer_id: UserId,
    },
}

impl TransportCommand {
    /// The request this command expects an answer for, if any.
    pub fn request_kind(&self) -> Option<RequestKind> {
        match self {
            Self::FetchBlockedUsers => Some(RequestKind::BlockedUsers),
            Self::FetchUnreadCounts => Some(RequestKind::UnreadCounts),
            Self::FetchHistory { peer_id, .. } => Some(RequestKind::History(*peer_id)),
            Self::MarkConversationRead { peer_id } => {
                Some(RequestKind::MarkConversationRead(*peer_id))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    BlockedUsers,
    UnreadCounts,
    History(UserId),
    MarkConversationRead(UserId),
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlockedUsers => write!(f, "blocked-users"),
            Self::UnreadCounts => write!(f, "unread-counts"),
            Self::History(peer) => write!(f, "history:{peer}"),
            Self::MarkConversationRead(peer) => write!(f, "mark-read:{peer}"),
        }
    }
}

/// Results of request commands, delivered whenever they resolve.
#[derive(Debug, Clone)]
pub enum TransportResponse {
    BlockedUsers(Vec<UserId>),
    UnreadCounts(UnreadSnapshot),
    History {
        peer_id: UserId,
        messages: Vec<Message>,
    },
    MarkReadConfirmed {
        peer_id: UserId,
        total_unread: u32,
    },
    Failed {
        request: RequestKind,
        reason: String,
    },
}
