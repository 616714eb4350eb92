//! The chat state controller.
//!
//! [`ChatController`] owns every store and drives them from three inputs:
//! inbound transport events, responses to its own requests, and user
//! actions. It never awaits anything. Outbound work is handed to the
//! [`Transport`] and timers are fired by whoever calls
//! [`ChatController::poll_timers`] at [`ChatController::next_deadline`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use arcade_shared::{
    ChannelType, ConversationSelection, GameInvitation, InboundEvent, Message, MessageKind,
    RequestKind, TransportCommand, TransportResponse, TypingUpdate, UserId,
};

use crate::badges::{BadgeScheduler, BadgeSnapshot, TriggerOutcome};
use crate::blocklist::BlockList;
use crate::clock::Clock;
use crate::config::ChatConfig;
use crate::conversations::ConversationStore;
use crate::error::ChatError;
use crate::notifications::NotificationCenter;
use crate::presence::PresenceTracker;
use crate::render::RenderSurface;
use crate::session::MatchSession;
use crate::transport::Transport;
use crate::typing::{TypingCoordinator, TypingSignal};
use crate::unread::UnreadTracker;

pub struct ChatController {
    local_user: UserId,
    max_message_length: usize,
    history_page_size: u32,
    selection: ConversationSelection,

    blocklist: BlockList,
    conversations: ConversationStore,
    unread: UnreadTracker,
    typing: TypingCoordinator,
    badges: BadgeScheduler,
    presence: PresenceTracker,
    notifications: NotificationCenter,

    transport: Box<dyn Transport>,
    render: Box<dyn RenderSurface>,
    session: Box<dyn MatchSession>,
    clock: Arc<dyn Clock>,
}

impl ChatController {
    pub fn new(
        config: &ChatConfig,
        transport: Box<dyn Transport>,
        render: Box<dyn RenderSurface>,
        session: Box<dyn MatchSession>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            local_user: config.local_user_id,
            max_message_length: config.max_message_length,
            history_page_size: config.history_page_size,
            selection: ConversationSelection::Global,
            blocklist: BlockList::new(),
            conversations: ConversationStore::with_capacity(config.broadcast_capacity),
            unread: UnreadTracker::new(),
            typing: TypingCoordinator::new(config.typing),
            badges: BadgeScheduler::new(config.badges),
            presence: PresenceTracker::new(),
            notifications: NotificationCenter::new(),
            transport,
            render,
            session,
            clock,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn selection(&self) -> ConversationSelection {
        self.selection
    }

    pub fn blocklist(&self) -> &BlockList {
        &self.blocklist
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn unread(&self) -> &UnreadTracker {
        &self.unread
    }

    pub fn typing(&self) -> &TypingCoordinator {
        &self.typing
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Bootstrap: pull the server-side state this core mirrors and arm the
    /// periodic badge refresh.
    pub fn start(&mut self) {
        info!(user = %self.local_user, "Chat controller starting");
        self.request(TransportCommand::FetchBlockedUsers);
        self.request(TransportCommand::FetchUnreadCounts);
        self.request(TransportCommand::RequestOnlineUsers);
        self.badges.start(self.clock.now());
        self.render_active();
        self.refresh_badges();
    }

    /// Stop typing and drop every pending timer.
    pub fn shutdown(&mut self) {
        if let Some(signal) = self.typing.stop_local() {
            self.send_typing(signal);
        }
        self.typing.clear();
        self.badges.stop();
        info!("Chat controller stopped");
    }

    // -----------------------------------------------------------------------
    // Inbound events
    // -----------------------------------------------------------------------

    pub fn handle_event(&mut self, event: InboundEvent) {
        trace!(event = event.name(), "Inbound event");

        match event {
            InboundEvent::GlobalMessage(message) => self.on_global_message(message),
            InboundEvent::PrivateMessage(message) => self.on_private_message(message),
            InboundEvent::GameInvitation(invitation) => self.on_game_invitation(invitation),
            InboundEvent::Typing(update) => self.on_typing(update),

            InboundEvent::UnreadSnapshot(snapshot) => {
                self.unread.reconcile(&snapshot, &self.blocklist);
                self.refresh_badges();
            }

            InboundEvent::Notifications(list) => {
                self.notifications.replace(list);
                self.refresh_badges();
            }

            InboundEvent::OnlineUsers(users) => {
                self.presence.replace_all(&users, self.clock.utc_now());
                self.refresh_badges();
            }

            InboundEvent::UserStatus(user) => {
                self.presence.upsert(&user, self.clock.utc_now());
                self.refresh_badges();
            }

            InboundEvent::Friendship(update) => {
                debug!(
                    user = %update.user_id,
                    status = ?update.status,
                    "Friendship updated"
                );
                self.refresh_badges();
            }

            InboundEvent::Malformed { event, reason } => {
                warn!(event = %event, reason = %reason, "Dropping malformed event");
            }

            InboundEvent::Unrecognized(tag) => {
                debug!(event = %tag, "Ignoring unrecognized event");
            }
        }
    }

    fn on_global_message(&mut self, message: Message) {
        if !self.conversations.append_global(message, &self.blocklist) {
            return;
        }
        if self.selection == ConversationSelection::Global {
            self.render_active();
        }
    }

    fn on_private_message(&mut self, message: Message) {
        let peer = match message.other_party(self.local_user) {
            Some(peer) => peer,
            None => {
                warn!(id = %message.id, "Dropping outbound private message without recipient");
                return;
            }
        };

        if self.blocklist.is_blocked(peer) || self.blocklist.is_blocked(message.sender_id) {
            trace!(peer = %peer, "Dropping private message from blocked peer");
            return;
        }

        let inbound = message.sender_id != self.local_user;
        let username = message.sender_username.clone();

        if !self.conversations.append_private(peer, message, &self.blocklist) {
            return;
        }

        let active = self.selection.is_private_with(peer);
        if inbound && !active {
            let count = self.unread.increment(peer, &username, self.clock.utc_now());
            debug!(peer = %peer, count, "Unread private message");
        }
        if active {
            self.render_active();
        }
        self.refresh_badges();
    }

    fn on_game_invitation(&mut self, invitation: GameInvitation) {
        let peer = invitation.sender_id;

        if self.blocklist.is_blocked(peer) {
            trace!(peer = %peer, "Dropping game invitation from blocked peer");
            return;
        }
        if self.session.is_busy() {
            info!(peer = %peer, "Game invitation ignored, match session busy");
            return;
        }

        let username = if invitation.sender_username.is_empty() {
            peer.to_string()
        } else {
            invitation.sender_username
        };
        self.render.show_invitation_prompt(peer, &username);

        let content = if invitation.content.is_empty() {
            format!("{username} challenged you to a game")
        } else {
            invitation.content
        };
        let message = Message {
            id: format!("invite-{}", Uuid::new_v4()),
            channel: ChannelType::Private,
            sender_id: peer,
            sender_username: username,
            recipient_id: Some(self.local_user),
            content,
            kind: MessageKind::GameInvite,
            metadata: invitation.metadata,
            created_at: self.clock.utc_now(),
        };

        if self.conversations.append_private(peer, message, &self.blocklist)
            && self.selection.is_private_with(peer)
        {
            self.render_active();
        }
    }

    fn on_typing(&mut self, update: TypingUpdate) {
        if self.blocklist.is_blocked(update.peer_id) {
            return;
        }
        if self.typing.remote_update(&update, self.clock.now()) {
            self.render_typing();
        }
    }

    // -----------------------------------------------------------------------
    // Request responses
    // -----------------------------------------------------------------------

    pub fn handle_response(&mut self, response: TransportResponse) {
        match response {
            TransportResponse::BlockedUsers(peers) => {
                let diff = self.blocklist.reconcile(peers);
                for &peer in &diff.added {
                    self.prune_peer(peer);
                }
                match self.selection {
                    ConversationSelection::Private(peer) if self.blocklist.is_blocked(peer) => {
                        self.render.render_blocked_conversation(peer);
                    }
                    ConversationSelection::Private(peer) if diff.removed.contains(&peer) => {
                        // Messages were pruned while blocked; pull them back.
                        self.render_active();
                        self.request(TransportCommand::FetchHistory {
                            peer_id: peer,
                            limit: self.history_page_size,
                        });
                    }
                    _ => self.render_active(),
                }
                self.refresh_badges();
            }

            TransportResponse::UnreadCounts(snapshot) => {
                self.unread.reconcile(&snapshot, &self.blocklist);
                self.refresh_badges();
            }

            TransportResponse::History { peer_id, messages } => {
                if self.blocklist.is_blocked(peer_id) {
                    debug!(peer = %peer_id, "Discarding history for blocked peer");
                    return;
                }
                self.conversations
                    .replace_private(peer_id, messages, &self.blocklist);
                if self.selection.is_private_with(peer_id) {
                    self.render_active();
                } else {
                    debug!(peer = %peer_id, "History arrived after selection changed");
                }
            }

            TransportResponse::MarkReadConfirmed {
                peer_id,
                total_unread,
            } => {
                if total_unread != self.unread.total() {
                    debug!(
                        peer = %peer_id,
                        local = self.unread.total(),
                        server = total_unread,
                        "Unread total drifted, refreshing"
                    );
                    self.request(TransportCommand::FetchUnreadCounts);
                }
            }

            TransportResponse::Failed { request, reason } => {
                warn!(request = %request, reason = %reason, "Transport request failed");
                if let RequestKind::MarkConversationRead(_) = request {
                    self.request(TransportCommand::FetchUnreadCounts);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------------

    pub fn switch_to_global(&mut self) {
        if let Some(signal) = self.typing.stop_local() {
            self.send_typing(signal);
        }
        self.selection = ConversationSelection::Global;
        self.render_active();
        self.render_typing();
    }

    pub fn select_private_conversation(
        &mut self,
        peer: UserId,
        username: &str,
    ) -> Result<(), ChatError> {
        if self.blocklist.is_blocked(peer) {
            return Err(self.report(ChatError::PeerBlocked(peer)));
        }

        if self.typing.local_peer().is_some_and(|local| local != peer) {
            if let Some(signal) = self.typing.stop_local() {
                self.send_typing(signal);
            }
        }

        self.selection = ConversationSelection::Private(peer);
        debug!(peer = %peer, username, "Private conversation selected");

        self.unread.mark_read(peer);
        self.request(TransportCommand::MarkConversationRead { peer_id: peer });

        self.render_active();
        self.render_typing();
        self.request(TransportCommand::FetchHistory {
            peer_id: peer,
            limit: self.history_page_size,
        });
        self.refresh_badges();
        Ok(())
    }

    /// Validate and send the composed text to the active conversation.
    ///
    /// Nothing is echoed locally; the message appears when the transport
    /// delivers it back.
    pub fn send_message(&mut self, text: &str, kind: MessageKind) -> Result<(), ChatError> {
        match self.try_send_message(text, kind) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.report(e)),
        }
    }

    fn try_send_message(&mut self, text: &str, kind: MessageKind) -> Result<(), ChatError> {
        let content = text.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let len = content.chars().count();
        if len > self.max_message_length {
            return Err(ChatError::MessageTooLong {
                len,
                max: self.max_message_length,
            });
        }

        let command = match self.selection {
            ConversationSelection::Global => TransportCommand::SendGlobalMessage {
                content: content.to_string(),
                kind,
            },
            ConversationSelection::Private(peer) => {
                if self.blocklist.is_blocked(peer) {
                    return Err(ChatError::PeerBlocked(peer));
                }
                TransportCommand::SendPrivateMessage {
                    peer_id: peer,
                    content: content.to_string(),
                    kind,
                }
            }
        };

        self.transport.send(command)?;
        self.render.clear_input();
        if let Some(signal) = self.typing.stop_local() {
            self.send_typing(signal);
        }
        Ok(())
    }

    pub fn on_local_keystroke(&mut self) {
        let peer = match self.selection.peer() {
            Some(peer) if !self.blocklist.is_blocked(peer) => peer,
            _ => return,
        };
        for signal in self.typing.local_keystroke(peer, self.clock.now()) {
            self.send_typing(signal);
        }
    }

    pub fn block_user(&mut self, peer: UserId) {
        if self.blocklist.block(peer) {
            self.request(TransportCommand::BlockUser { peer_id: peer });
        }
        let removed = self.prune_peer(peer);

        match self.selection {
            ConversationSelection::Private(active) if active == peer => {
                self.render.render_blocked_conversation(peer);
            }
            _ if removed > 0 => self.render_active(),
            _ => {}
        }
        self.refresh_badges();
    }

    pub fn unblock_user(&mut self, peer: UserId) {
        if !self.blocklist.unblock(peer) {
            return;
        }
        self.request(TransportCommand::UnblockUser { peer_id: peer });

        if self.selection.is_private_with(peer) {
            self.render_active();
            self.request(TransportCommand::FetchHistory {
                peer_id: peer,
                limit: self.history_page_size,
            });
        }
    }

    pub fn accept_invitation(&mut self, peer: UserId) {
        info!(peer = %peer, "Accepting game invitation");
        self.request(TransportCommand::CreateRemoteGame { peer_id: peer });
    }

    pub fn decline_invitation(&mut self, peer: UserId) {
        info!(peer = %peer, "Declining game invitation");
        self.request(TransportCommand::DeclineChallenge { peer_id: peer });
    }

    pub fn mark_notification_read(&mut self, id: &str) {
        self.notifications.mark_read(id);
        self.request(TransportCommand::MarkNotificationRead {
            notification_id: id.to_string(),
        });
        self.refresh_badges();
    }

    pub fn mark_all_notifications_read(&mut self) {
        self.notifications.mark_all_read();
        self.request(TransportCommand::MarkAllNotificationsRead);
        self.refresh_badges();
    }

    pub fn refresh_online_users(&mut self) {
        self.request(TransportCommand::RequestOnlineUsers);
    }

    pub fn refresh_unread(&mut self) {
        self.request(TransportCommand::FetchUnreadCounts);
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// Fire every typing and badge timer that is due.
    pub fn poll_timers(&mut self) {
        let now = self.clock.now();

        let expiry = self.typing.poll(now);
        for signal in expiry.signals {
            self.send_typing(signal);
        }
        if expiry.remote_changed {
            self.render_typing();
        }

        if self.badges.poll(now) {
            self.refresh_badges();
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.typing.next_deadline(), self.badges.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Remove every trace of a newly blocked peer. Returns the number of
    /// messages removed.
    fn prune_peer(&mut self, peer: UserId) -> usize {
        let removed = self.conversations.prune_sender(peer);
        self.unread.remove_peer(peer);
        if self.typing.clear_peer(peer) {
            self.render_typing();
        }
        removed
    }

    fn refresh_badges(&mut self) {
        match self.badges.trigger(self.clock.now()) {
            TriggerOutcome::Run => {}
            outcome => {
                trace!(?outcome, "Badge refresh skipped");
                return;
            }
        }

        let snapshot = BadgeSnapshot::compute(&self.unread, &self.presence, &self.notifications);
        self.render.update_main_badge(snapshot.main);
        for (peer, count) in self.badges.user_updates(&snapshot) {
            self.render.update_user_badge(peer, count);
        }
        self.render.update_notification_badge(snapshot.notifications);

        self.badges.complete(self.clock.now());
    }

    fn render_active(&mut self) {
        let messages = self.conversations.get_active(self.selection);
        self.render.render_conversation(self.selection, messages);
    }

    fn render_typing(&mut self) {
        let usernames = self.typing.indicator_for(self.selection);
        self.render.update_typing_indicator(usernames.as_deref());
    }

    fn send_typing(&mut self, signal: TypingSignal) {
        self.request(TransportCommand::SendTypingIndicator {
            peer_id: signal.peer_id,
            is_typing: signal.is_typing,
        });
    }

    /// Fire-and-forget send. Failures are logged; the next snapshot or
    /// explicit refresh corrects any state that depended on it.
    fn request(&mut self, command: TransportCommand) {
        if let Err(e) = self.transport.send(command) {
            warn!(error = %e, "Failed to queue transport command");
        }
    }

    fn report(&mut self, error: ChatError) -> ChatError {
        match error.user_message() {
            Some(text) => {
                debug!(error = %error, "User action rejected");
                self.render.show_user_error(&text);
            }
            None => trace!(error = %error, "User action ignored"),
        }
        error
    }
}
