//! Render-surface seam.
//!
//! The controller only decides *when* and *what* to draw. Implementations of
//! [`RenderSurface`] turn those calls into markup, terminal output, or (in
//! tests) a recorded list of [`RenderCall`]s.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use arcade_shared::{ConversationSelection, Message, MessageKind, TournamentInvite, UserId};

pub trait RenderSurface: Send {
    fn render_conversation(&mut self, selection: ConversationSelection, messages: &[Message]);
    fn render_blocked_conversation(&mut self, peer: UserId);
    fn update_main_badge(&mut self, total: u32);
    fn update_user_badge(&mut self, peer: UserId, count: u32);
    fn update_notification_badge(&mut self, count: u32);
    fn update_typing_indicator(&mut self, usernames: Option<&[String]>);
    fn show_invitation_prompt(&mut self, peer: UserId, username: &str);
    fn show_user_error(&mut self, message: &str);
    fn clear_input(&mut self);
}

/// One render-surface call as a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "render", rename_all = "snake_case")]
pub enum RenderCall {
    Conversation {
        selection: ConversationSelection,
        messages: Vec<RenderedMessage>,
    },
    BlockedConversation {
        peer_id: UserId,
    },
    MainBadge {
        total: u32,
    },
    UserBadge {
        peer_id: UserId,
        count: u32,
    },
    NotificationBadge {
        count: u32,
    },
    TypingIndicator {
        usernames: Option<Vec<String>>,
    },
    InvitationPrompt {
        peer_id: UserId,
        username: String,
    },
    UserError {
        message: String,
    },
    ClearInput,
}

/// Display-ready view of a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedMessage {
    pub id: String,
    pub sender_id: UserId,
    pub sender_username: String,
    pub kind: MessageKind,
    pub text: String,
}

impl From<&Message> for RenderedMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            sender_id: message.sender_id,
            sender_username: message.sender_username.clone(),
            kind: message.kind,
            text: display_text(message),
        }
    }
}

/// Message body as shown to the user. Tournament invites include the
/// tournament name when the metadata parses and fall back to the raw
/// content otherwise.
pub fn display_text(message: &Message) -> String {
    match message.kind {
        MessageKind::TournamentInvite => match TournamentInvite::from_message(message) {
            Some(TournamentInvite {
                tournament_name: Some(name),
                ..
            }) => format!("{} [{}]", message.content, name),
            Some(invite) => format!("{} [tournament #{}]", message.content, invite.tournament_id),
            None => message.content.clone(),
        },
        _ => message.content.clone(),
    }
}

/// Receives render calls as values. Anything implementing it is a
/// [`RenderSurface`].
pub trait RenderSink: Send {
    fn emit(&mut self, call: RenderCall);
}

impl<T: RenderSink> RenderSurface for T {
    fn render_conversation(&mut self, selection: ConversationSelection, messages: &[Message]) {
        self.emit(RenderCall::Conversation {
            selection,
            messages: messages.iter().map(RenderedMessage::from).collect(),
        });
    }

    fn render_blocked_conversation(&mut self, peer: UserId) {
        self.emit(RenderCall::BlockedConversation { peer_id: peer });
    }

    fn update_main_badge(&mut self, total: u32) {
        self.emit(RenderCall::MainBadge { total });
    }

    fn update_user_badge(&mut self, peer: UserId, count: u32) {
        self.emit(RenderCall::UserBadge { peer_id: peer, count });
    }

    fn update_notification_badge(&mut self, count: u32) {
        self.emit(RenderCall::NotificationBadge { count });
    }

    fn update_typing_indicator(&mut self, usernames: Option<&[String]>) {
        self.emit(RenderCall::TypingIndicator {
            usernames: usernames.map(<[String]>::to_vec),
        });
    }

    fn show_invitation_prompt(&mut self, peer: UserId, username: &str) {
        self.emit(RenderCall::InvitationPrompt {
            peer_id: peer,
            username: username.to_string(),
        });
    }

    fn show_user_error(&mut self, message: &str) {
        self.emit(RenderCall::UserError {
            message: message.to_string(),
        });
    }

    fn clear_input(&mut self) {
        self.emit(RenderCall::ClearInput);
    }
}

/// Records every call. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.lock().clone()
    }

    /// Return and forget everything recorded so far.
    pub fn take(&self) -> Vec<RenderCall> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RenderCall>> {
        self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl RenderSink for RecordingSurface {
    fn emit(&mut self, call: RenderCall) {
        self.lock().push(call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::private_message;
    use serde_json::json;

    #[test]
    fn test_display_text_tournament_invite() {
        let mut msg = private_message(1, 7, 1, "Join us");
        msg.kind = MessageKind::TournamentInvite;
        msg.metadata = Some(json!({ "tournamentId": 3, "tournamentName": "Cup" }));
        assert_eq!(display_text(&msg), "Join us [Cup]");

        msg.metadata = Some(json!({ "tournamentId": 3 }));
        assert_eq!(display_text(&msg), "Join us [tournament #3]");

        msg.metadata = Some(json!("garbage"));
        assert_eq!(display_text(&msg), "Join us");
    }

    #[test]
    fn test_recording_surface_shares_log() {
        let surface = RecordingSurface::new();
        let mut handle = surface.clone();

        handle.update_main_badge(3);
        handle.update_typing_indicator(None);
        assert_eq!(
            surface.take(),
            vec![
                RenderCall::MainBadge { total: 3 },
                RenderCall::TypingIndicator { usernames: None },
            ]
        );
        assert!(surface.calls().is_empty());
    }

    #[test]
    fn test_render_call_serializes_tagged() {
        let value = serde_json::to_value(RenderCall::UserBadge {
            peer_id: UserId(7),
            count: 2,
        })
        .unwrap();
        assert_eq!(value, json!({ "render": "user_badge", "peer_id": 7, "count": 2 }));
    }
}
