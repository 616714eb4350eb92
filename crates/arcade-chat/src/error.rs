use thiserror::Error;

use arcade_shared::UserId;

/// Failures handing a command to the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport channel closed")]
    Closed,

    #[error("Transport queue full")]
    Full,
}

/// Errors returned by user-initiated controller operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Message too long: {len} characters (max {max})")]
    MessageTooLong { len: usize, max: usize },

    #[error("Peer {0} is blocked")]
    PeerBlocked(UserId),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl ChatError {
    /// Text shown to the user, or `None` for silent rejections.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::EmptyMessage => None,
            Self::MessageTooLong { max, .. } => {
                Some(format!("Message is too long (maximum {max} characters)"))
            }
            Self::PeerBlocked(_) => Some("You have blocked this user".to_string()),
            Self::Transport(_) => Some("Failed to send message, please try again".to_string()),
        }
    }
}
