//! Tokio driver for [`ChatController`].
//!
//! One task owns the controller. Everything that reaches it (transport
//! events, request responses, user actions) arrives on a single channel,
//! and the loop sleeps until the controller's next timer deadline in
//! between.

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant as TokioInstant};
use tracing::{debug, info, warn};

use arcade_shared::{InboundEvent, MessageKind, TransportResponse, UserId};

use crate::controller::ChatController;

/// Something the UI asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    SwitchToGlobal,
    SelectPrivate { peer: UserId, username: String },
    SendMessage { text: String, kind: MessageKind },
    Keystroke,
    Block(UserId),
    Unblock(UserId),
    AcceptInvitation(UserId),
    DeclineInvitation(UserId),
    MarkNotificationRead(String),
    MarkAllNotificationsRead,
    RefreshOnlineUsers,
    RefreshUnread,
}

#[derive(Debug, Clone)]
pub enum ChatInput {
    Event(InboundEvent),
    Response(TransportResponse),
    Action(UserAction),
    Shutdown,
}

/// Sender half handed to the socket task and the UI.
pub type InputSender = mpsc::Sender<ChatInput>;

pub fn input_channel(buffer: usize) -> (InputSender, mpsc::Receiver<ChatInput>) {
    mpsc::channel(buffer)
}

/// Run the controller until [`ChatInput::Shutdown`] arrives or every sender
/// is dropped. Returns the controller so callers can inspect final state.
pub async fn run(
    mut controller: ChatController,
    mut input_rx: mpsc::Receiver<ChatInput>,
) -> ChatController {
    controller.start();
    info!("Chat runtime started");

    loop {
        let deadline = controller.next_deadline();

        tokio::select! {
            input = input_rx.recv() => {
                match input {
                    Some(ChatInput::Event(event)) => controller.handle_event(event),
                    Some(ChatInput::Response(response)) => controller.handle_response(response),
                    Some(ChatInput::Action(action)) => apply_action(&mut controller, action),
                    Some(ChatInput::Shutdown) => {
                        info!("Shutdown requested");
                        break;
                    }
                    None => {
                        warn!("All chat input senders dropped");
                        break;
                    }
                }
            }

            _ = sleep_until(to_tokio(deadline)), if deadline.is_some() => {
                controller.poll_timers();
            }
        }

        // Inputs can leave timers overdue while the select was busy.
        controller.poll_timers();
    }

    controller.shutdown();
    controller
}

fn to_tokio(deadline: Option<std::time::Instant>) -> TokioInstant {
    match deadline {
        Some(deadline) => TokioInstant::from_std(deadline),
        None => TokioInstant::now(),
    }
}

pub fn apply_action(controller: &mut ChatController, action: UserAction) {
    debug!(action = ?action, "User action");

    match action {
        UserAction::SwitchToGlobal => controller.switch_to_global(),
        UserAction::SelectPrivate { peer, username } => {
            // Rejections are already shown to the user.
            let _ = controller.select_private_conversation(peer, &username);
        }
        UserAction::SendMessage { text, kind } => {
            let _ = controller.send_message(&text, kind);
        }
        UserAction::Keystroke => controller.on_local_keystroke(),
        UserAction::Block(peer) => controller.block_user(peer),
        UserAction::Unblock(peer) => controller.unblock_user(peer),
        UserAction::AcceptInvitation(peer) => controller.accept_invitation(peer),
        UserAction::DeclineInvitation(peer) => controller.decline_invitation(peer),
        UserAction::MarkNotificationRead(id) => controller.mark_notification_read(&id),
        UserAction::MarkAllNotificationsRead => controller.mark_all_notifications_read(),
        UserAction::RefreshOnlineUsers => controller.refresh_online_users(),
        UserAction::RefreshUnread => controller.refresh_unread(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arcade_shared::TransportCommand;

    use crate::clock::SystemClock;
    use crate::config::ChatConfig;
    use crate::render::{RecordingSurface, RenderCall};
    use crate::session::SessionFlags;
    use crate::testing::{private_message, RecordingTransport};

    fn controller(transport: &RecordingTransport, surface: &RecordingSurface) -> ChatController {
        let config = ChatConfig {
            local_user_id: UserId(1),
            ..ChatConfig::default()
        };
        ChatController::new(
            &config,
            Box::new(transport.clone()),
            Box::new(surface.clone()),
            Box::new(SessionFlags::new()),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn test_runtime_dispatches_until_shutdown() {
        let transport = RecordingTransport::new();
        let surface = RecordingSurface::new();
        let (tx, rx) = input_channel(16);

        let handle = tokio::spawn(run(controller(&transport, &surface), rx));

        tx.send(ChatInput::Event(InboundEvent::PrivateMessage(private_message(
            1, 7, 1, "hi",
        ))))
        .await
        .unwrap();
        tx.send(ChatInput::Action(UserAction::SelectPrivate {
            peer: UserId(7),
            username: "user7".into(),
        }))
        .await
        .unwrap();
        tx.send(ChatInput::Action(UserAction::SendMessage {
            text: "hello".into(),
            kind: MessageKind::Text,
        }))
        .await
        .unwrap();
        tx.send(ChatInput::Shutdown).await.unwrap();

        let controller = handle.await.unwrap();
        assert_eq!(controller.unread().total(), 0);

        let sent = transport.take();
        assert_eq!(sent[0], TransportCommand::FetchBlockedUsers);
        assert!(sent.contains(&TransportCommand::SendPrivateMessage {
            peer_id: UserId(7),
            content: "hello".into(),
            kind: MessageKind::Text,
        }));
        assert!(surface.calls().contains(&RenderCall::ClearInput));
    }

    #[tokio::test]
    async fn test_runtime_stops_when_senders_dropped() {
        let transport = RecordingTransport::new();
        let surface = RecordingSurface::new();
        let (tx, rx) = input_channel(4);
        drop(tx);

        let controller = run(controller(&transport, &surface), rx).await;
        assert_eq!(controller.next_deadline(), None);
    }

    #[tokio::test]
    async fn test_runtime_fires_timers() {
        let transport = RecordingTransport::new();
        let surface = RecordingSurface::new();
        let (tx, rx) = input_channel(4);

        let mut config = ChatConfig {
            local_user_id: UserId(1),
            ..ChatConfig::default()
        };
        config.typing.idle_timeout = std::time::Duration::from_millis(50);
        let controller = ChatController::new(
            &config,
            Box::new(transport.clone()),
            Box::new(surface.clone()),
            Box::new(SessionFlags::new()),
            Arc::new(SystemClock),
        );

        let handle = tokio::spawn(run(controller, rx));
        tx.send(ChatInput::Action(UserAction::SelectPrivate {
            peer: UserId(7),
            username: "user7".into(),
        }))
        .await
        .unwrap();
        tx.send(ChatInput::Action(UserAction::Keystroke)).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        let before_shutdown = transport.take();
        tx.send(ChatInput::Shutdown).await.unwrap();
        handle.await.unwrap();

        let stops = before_shutdown
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    TransportCommand::SendTypingIndicator {
                        is_typing: false,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(stops, 1);
    }
}
