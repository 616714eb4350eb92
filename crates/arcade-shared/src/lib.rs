//! # arcade-shared
//!
//! Wire-boundary types for the Arcade chat client: identifiers, messages,
//! inbound transport events, outbound transport commands and the payload
//! normalisation that turns loosely-shaped server JSON into typed values.

pub mod constants;
pub mod error;
pub mod friends;
pub mod protocol;
pub mod types;

pub use error::ProtocolError;
pub use friends::{FriendshipStatus, FriendshipUpdate};
pub use protocol::{
    EventEnvelope, GameInvitation, InboundEvent, Notification, NotificationList, PresenceUser,
    RequestKind, TournamentInvite, TransportCommand, TransportResponse, TypingUpdate, UnreadCount,
    UnreadSnapshot,
};
pub use types::{ChannelType, ConversationSelection, Message, MessageKind, UserId};
