//! # arcade-chat
//!
//! Client-side chat state for the Arcade platform: the broadcast feed and
//! private conversations, unread counters, typing presence, the block list
//! and notification badges.
//!
//! [`controller::ChatController`] is a synchronous state machine. The
//! transport, the render surface, the match session and the clock are
//! injected, and [`runtime::run`] drives it from a tokio task.

pub mod badges;
pub mod blocklist;
pub mod clock;
pub mod config;
pub mod controller;
pub mod conversations;
pub mod error;
pub mod notifications;
pub mod presence;
pub mod render;
pub mod runtime;
pub mod session;
pub mod timers;
pub mod transport;
pub mod typing;
pub mod unread;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ChatConfig;
pub use controller::ChatController;
pub use error::{ChatError, TransportError};

/// Install the global tracing subscriber. Respects `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("arcade_chat=debug,arcade_shared=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
