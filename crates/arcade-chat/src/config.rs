//! Chat core configuration loaded from environment variables.
//!
//! Every setting has a default so the core can start with zero
//! configuration. Unparsable values are logged and ignored.

use std::str::FromStr;
use std::time::Duration;

use arcade_shared::constants::{BROADCAST_CAPACITY, HISTORY_PAGE_SIZE, MAX_MESSAGE_LENGTH};
use arcade_shared::UserId;

use crate::badges::BadgeConfig;
use crate::typing::TypingConfig;

/// Chat core configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Account id of the signed-in user.
    /// Env: `ARCADE_USER_ID`
    /// Default: `0`
    pub local_user_id: UserId,

    /// Messages kept in the broadcast feed. Values above the protocol
    /// limit are clamped to it.
    /// Env: `ARCADE_BROADCAST_CAPACITY`
    /// Default: `50`
    pub broadcast_capacity: usize,

    /// Longest accepted outbound message, in characters.
    /// Env: `ARCADE_MAX_MESSAGE_LEN`
    /// Default: `500`
    pub max_message_length: usize,

    /// Messages requested per history fetch.
    /// Env: `ARCADE_HISTORY_PAGE_SIZE`
    /// Default: `50`
    pub history_page_size: u32,

    /// Env: `ARCADE_TYPING_SEND_COOLDOWN_MS`, `ARCADE_TYPING_IDLE_MS`,
    /// `ARCADE_TYPING_EXPIRY_MS`
    pub typing: TypingConfig,

    /// Env: `ARCADE_BADGE_MIN_GAP_MS`, `ARCADE_BADGE_COALESCE_MS`,
    /// `ARCADE_BADGE_TICK_MS`
    pub badges: BadgeConfig,

    /// Capacity of the runtime input channel.
    pub input_buffer: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            local_user_id: UserId(0),
            broadcast_capacity: BROADCAST_CAPACITY,
            max_message_length: MAX_MESSAGE_LENGTH,
            history_page_size: HISTORY_PAGE_SIZE,
            typing: TypingConfig::default(),
            badges: BadgeConfig::default(),
            input_buffer: 256,
        }
    }
}

impl ChatConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(id) = parse_var::<u64, _>(&lookup, "ARCADE_USER_ID") {
            config.local_user_id = UserId(id);
        }

        if let Some(n) = parse_var::<usize, _>(&lookup, "ARCADE_BROADCAST_CAPACITY") {
            if n == 0 {
                tracing::warn!("ARCADE_BROADCAST_CAPACITY must be positive, using default");
            } else if n > BROADCAST_CAPACITY {
                tracing::warn!(
                    requested = n,
                    max = BROADCAST_CAPACITY,
                    "ARCADE_BROADCAST_CAPACITY above limit, clamping"
                );
                config.broadcast_capacity = BROADCAST_CAPACITY;
            } else {
                config.broadcast_capacity = n;
            }
        }

        if let Some(n) = parse_var::<usize, _>(&lookup, "ARCADE_MAX_MESSAGE_LEN") {
            config.max_message_length = n;
        }

        if let Some(n) = parse_var::<u32, _>(&lookup, "ARCADE_HISTORY_PAGE_SIZE") {
            config.history_page_size = n;
        }

        // -- Timers --

        if let Some(d) = parse_millis(&lookup, "ARCADE_TYPING_SEND_COOLDOWN_MS") {
            config.typing.send_cooldown = d;
        }
        if let Some(d) = parse_millis(&lookup, "ARCADE_TYPING_IDLE_MS") {
            config.typing.idle_timeout = d;
        }
        if let Some(d) = parse_millis(&lookup, "ARCADE_TYPING_EXPIRY_MS") {
            config.typing.remote_expiry = d;
        }

        if let Some(d) = parse_millis(&lookup, "ARCADE_BADGE_MIN_GAP_MS") {
            config.badges.min_gap = d;
        }
        if let Some(d) = parse_millis(&lookup, "ARCADE_BADGE_COALESCE_MS") {
            config.badges.coalesce_delay = d;
        }
        if let Some(d) = parse_millis(&lookup, "ARCADE_BADGE_TICK_MS") {
            if d.is_zero() {
                tracing::warn!("ARCADE_BADGE_TICK_MS must be positive, using default");
            } else {
                config.badges.tick_interval = d;
            }
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
            None
        }
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse_var::<u64, _>(lookup, key).map(Duration::from_millis)
}
