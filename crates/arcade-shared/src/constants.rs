/// Application name
pub const APP_NAME: &str = "Arcade";

/// Number of messages kept in the broadcast feed
pub const BROADCAST_CAPACITY: usize = 50;

/// Maximum outgoing message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 500;

/// Default page size when fetching private conversation history
pub const HISTORY_PAGE_SIZE: u32 = 50;

/// Minimum gap between two outbound typing=true sends to the same peer
pub const TYPING_SEND_COOLDOWN_MS: u64 = 1_000;

/// Local typing stops after this long without a keystroke
pub const TYPING_IDLE_TIMEOUT_MS: u64 = 3_000;

/// Remote typing entries expire after this long without a refresh
pub const TYPING_EXPIRY_MS: u64 = 3_000;

/// Minimum gap between two completed badge recomputes
pub const BADGE_MIN_GAP_MS: u64 = 1_000;

/// Delay of the trailing badge recompute after a burst of triggers
pub const BADGE_COALESCE_MS: u64 = 200;

/// Period of the background badge safety tick
pub const BADGE_TICK_MS: u64 = 5_000;

/// Inbound transport event tags
pub const EVENT_GLOBAL_MESSAGE: &str = "global_message";
pub const EVENT_TOURNAMENT_ANNOUNCEMENT: &str = "tournament_announcement";
pub const EVENT_PRIVATE_MESSAGE: &str = "private_message";
pub const EVENT_GAME_INVITATION: &str = "game_invitation";
pub const EVENT_TYPING_INDICATOR: &str = "typing_indicator";
pub const EVENT_UNREAD_COUNT_UPDATE: &str = "unread_count_update";
pub const EVENT_NOTIFICATIONS_UPDATE: &str = "notifications_update";
pub const EVENT_ONLINE_USERS: &str = "online_users";
pub const EVENT_USER_STATUS_UPDATE: &str = "user_status_update";
pub const EVENT_FRIENDSHIP_UPDATE: &str = "friendship_update";
