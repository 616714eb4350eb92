//! Typing presence.
//!
//! Two independent halves share one timer set:
//!
//! - **Local**: keystrokes while viewing a peer's conversation send
//!   `typing=true` at most once per send cooldown, and an idle timer armed
//!   from the last keystroke sends `typing=false` when it runs out.
//! - **Remote**: each `typing=true` from a peer (re)arms an expiry timer for
//!   that peer; expiry or an explicit `typing=false` removes the entry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use arcade_shared::constants::{TYPING_EXPIRY_MS, TYPING_IDLE_TIMEOUT_MS, TYPING_SEND_COOLDOWN_MS};
use arcade_shared::{ConversationSelection, TypingUpdate, UserId};

use crate::timers::{TimerHandle, Timers};

#[derive(Debug, Clone, Copy)]
pub struct TypingConfig {
    pub send_cooldown: Duration,
    pub idle_timeout: Duration,
    pub remote_expiry: Duration,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            send_cooldown: Duration::from_millis(TYPING_SEND_COOLDOWN_MS),
            idle_timeout: Duration::from_millis(TYPING_IDLE_TIMEOUT_MS),
            remote_expiry: Duration::from_millis(TYPING_EXPIRY_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypingTimer {
    LocalIdle(UserId),
    RemoteExpiry(UserId),
}

/// An outbound typing indicator the caller must forward to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingSignal {
    pub peer_id: UserId,
    pub is_typing: bool,
}

impl TypingSignal {
    fn start(peer_id: UserId) -> Self {
        Self { peer_id, is_typing: true }
    }

    fn stop(peer_id: UserId) -> Self {
        Self { peer_id, is_typing: false }
    }
}

/// A remote peer currently shown as typing.
#[derive(Debug, Clone)]
struct TypingEntry {
    username: String,
    timer: TimerHandle,
}

#[derive(Debug, Clone, Copy)]
struct LocalTyping {
    peer: UserId,
    last_sent: Instant,
    idle_timer: TimerHandle,
}

/// Result of firing due typing timers.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TypingExpiry {
    pub signals: Vec<TypingSignal>,
    pub remote_changed: bool,
}

#[derive(Debug)]
pub struct TypingCoordinator {
    config: TypingConfig,
    timers: Timers<TypingTimer>,
    local: Option<LocalTyping>,
    remote: HashMap<UserId, TypingEntry>,
}

impl TypingCoordinator {
    pub fn new(config: TypingConfig) -> Self {
        Self {
            config,
            timers: Timers::new(),
            local: None,
            remote: HashMap::new(),
        }
    }

    // -- Local side ---------------------------------------------------------

    /// Register a local keystroke in `peer`'s conversation.
    pub fn local_keystroke(&mut self, peer: UserId, now: Instant) -> Vec<TypingSignal> {
        let mut signals = Vec::new();

        if self.local.is_some_and(|local| local.peer != peer) {
            signals.extend(self.stop_local());
        }

        match self.local.as_mut() {
            Some(local) => {
                self.timers.cancel(local.idle_timer);
                local.idle_timer =
                    self.timers
                        .schedule(now, self.config.idle_timeout, TypingTimer::LocalIdle(peer));
                if now.duration_since(local.last_sent) >= self.config.send_cooldown {
                    local.last_sent = now;
                    signals.push(TypingSignal::start(peer));
                } else {
                    trace!(peer = %peer, "Typing send suppressed by cooldown");
                }
            }
            None => {
                let idle_timer =
                    self.timers
                        .schedule(now, self.config.idle_timeout, TypingTimer::LocalIdle(peer));
                self.local = Some(LocalTyping {
                    peer,
                    last_sent: now,
                    idle_timer,
                });
                signals.push(TypingSignal::start(peer));
            }
        }

        signals
    }

    /// Explicitly stop local typing (message sent, conversation switched).
    pub fn stop_local(&mut self) -> Option<TypingSignal> {
        let local = self.local.take()?;
        self.timers.cancel(local.idle_timer);
        Some(TypingSignal::stop(local.peer))
    }

    pub fn local_peer(&self) -> Option<UserId> {
        self.local.map(|local| local.peer)
    }

    // -- Remote side --------------------------------------------------------

    /// Apply a remote typing event. Returns `true` if the visible set changed.
    pub fn remote_update(&mut self, update: &TypingUpdate, now: Instant) -> bool {
        let peer = update.peer_id;

        if update.is_typing {
            if let Some(previous) = self.remote.remove(&peer) {
                self.timers.cancel(previous.timer);
            }
            let timer = self
                .timers
                .schedule(now, self.config.remote_expiry, TypingTimer::RemoteExpiry(peer));
            let username = if update.username.is_empty() {
                peer.to_string()
            } else {
                update.username.clone()
            };
            self.remote.insert(
                peer,
                TypingEntry { username, timer },
            );
            true
        } else {
            match self.remote.remove(&peer) {
                Some(entry) => {
                    self.timers.cancel(entry.timer);
                    true
                }
                None => false,
            }
        }
    }

    pub fn is_typing(&self, peer: UserId) -> bool {
        self.remote.contains_key(&peer)
    }

    /// Usernames to show in the typing indicator for the given selection.
    pub fn indicator_for(&self, selection: ConversationSelection) -> Option<Vec<String>> {
        let peer = selection.peer()?;
        self.remote.get(&peer).map(|entry| vec![entry.username.clone()])
    }

    // -- Timers and teardown --------------------------------------------------

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Fire every due timer.
    pub fn poll(&mut self, now: Instant) -> TypingExpiry {
        let mut expiry = TypingExpiry::default();

        for timer in self.timers.pop_due(now) {
            match timer {
                TypingTimer::LocalIdle(peer) => {
                    if self.local.is_some_and(|local| local.peer == peer) {
                        self.local = None;
                        debug!(peer = %peer, "Local typing went idle");
                        expiry.signals.push(TypingSignal::stop(peer));
                    }
                }
                TypingTimer::RemoteExpiry(peer) => {
                    if self.remote.remove(&peer).is_some() {
                        debug!(peer = %peer, "Remote typing expired");
                        expiry.remote_changed = true;
                    }
                }
            }
        }

        expiry
    }

    /// Drop all typing state for a peer without emitting any signal.
    /// Returns `true` if the remote set changed.
    pub fn clear_peer(&mut self, peer: UserId) -> bool {
        if let Some(local) = self.local {
            if local.peer == peer {
                self.timers.cancel(local.idle_timer);
                self.local = None;
            }
        }
        match self.remote.remove(&peer) {
            Some(entry) => {
                self.timers.cancel(entry.timer);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.timers.clear();
        self.local = None;
        self.remote.clear();
    }
}

impl Default for TypingCoordinator {
    fn default() -> Self {
        Self::new(TypingConfig::default())
    }
}
