//! Match/session flags consulted before accepting a game invitation.
//!
//! The flags are owned by the matchmaking feature; the chat core only reads
//! them through [`MatchSession`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait MatchSession: Send {
    /// The local user has challenged someone and is waiting for an answer.
    fn has_outgoing_challenge(&self) -> bool;

    /// A remote game has been created and not yet started or abandoned.
    fn has_pending_remote_game(&self) -> bool;

    fn is_busy(&self) -> bool {
        self.has_outgoing_challenge() || self.has_pending_remote_game()
    }
}

/// Shared flags handle. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct SessionFlags {
    outgoing_challenge: Arc<AtomicBool>,
    pending_remote_game: Arc<AtomicBool>,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_outgoing_challenge(&self, value: bool) {
        self.outgoing_challenge.store(value, Ordering::Relaxed);
    }

    pub fn set_pending_remote_game(&self, value: bool) {
        self.pending_remote_game.store(value, Ordering::Relaxed);
    }
}

impl MatchSession for SessionFlags {
    fn has_outgoing_challenge(&self) -> bool {
        self.outgoing_challenge.load(Ordering::Relaxed)
    }

    fn has_pending_remote_game(&self) -> bool {
        self.pending_remote_game.load(Ordering::Relaxed)
    }
}
