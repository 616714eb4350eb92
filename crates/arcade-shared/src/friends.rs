//! Friendship update normalisation.
//!
//! The friends service has emitted several payload shapes over time:
//!
//! - `{ "friend": { "id", "username" }, "status" }`
//! - `{ "userId" | "user_id", "username", "status" }`
//! - `{ "friendship": { "friendId" | "friend_id", "friendUsername", "status" } }`
//!
//! [`FriendshipUpdate::from_value`] is the single place that knows about
//! them; everything downstream only sees the canonical struct.

use serde_json::Value;

use crate::error::ProtocolError;
use crate::types::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Removed,
    Blocked,
}

impl FriendshipStatus {
    fn parse(raw: &str) -> Result<Self, ProtocolError> {
        match raw.to_ascii_lowercase().as_str() {
            "pending" | "requested" => Ok(Self::Pending),
            "accepted" | "friends" => Ok(Self::Accepted),
            "removed" | "declined" | "rejected" => Ok(Self::Removed),
            "blocked" => Ok(Self::Blocked),
            other => Err(ProtocolError::InvalidField {
                field: "status",
                reason: format!("unknown friendship status '{other}'"),
            }),
        }
    }
}

/// Canonical friendship change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendshipUpdate {
    pub user_id: UserId,
    pub username: Option<String>,
    pub status: FriendshipStatus,
}

impl FriendshipUpdate {
    /// Extract and validate a friendship update from any known shape.
    pub fn from_value(payload: &Value) -> Result<Self, ProtocolError> {
        let obj = payload
            .as_object()
            .ok_or(ProtocolError::UnknownShape("friendship_update"))?;

        if let Some(friend) = obj.get("friend") {
            return Ok(Self {
                user_id: user_id_field(friend, &["id"])?,
                username: string_field(friend, &["username"]),
                status: status_field(payload)?,
            });
        }

        if let Some(friendship) = obj.get("friendship") {
            return Ok(Self {
                user_id: user_id_field(friendship, &["friendId", "friend_id"])?,
                username: string_field(friendship, &["friendUsername", "friend_username"]),
                status: status_field(friendship)?,
            });
        }

        if obj.contains_key("userId") || obj.contains_key("user_id") {
            return Ok(Self {
                user_id: user_id_field(payload, &["userId", "user_id"])?,
                username: string_field(payload, &["username"]),
                status: status_field(payload)?,
            });
        }

        Err(ProtocolError::UnknownShape("friendship_update"))
    }
}

fn user_id_field(value: &Value, keys: &[&'static str]) -> Result<UserId, ProtocolError> {
    let field = keys[0];
    let raw = keys
        .iter()
        .find_map(|k| value.get(*k))
        .ok_or(ProtocolError::MissingField(field))?;

    match raw {
        Value::Number(n) => n.as_u64().map(UserId).ok_or_else(|| ProtocolError::InvalidField {
            field,
            reason: format!("not an unsigned id: {n}"),
        }),
        Value::String(s) => s.parse::<u64>().map(UserId).map_err(|e| ProtocolError::InvalidField {
            field,
            reason: e.to_string(),
        }),
        other => Err(ProtocolError::InvalidField {
            field,
            reason: format!("unexpected type: {other}"),
        }),
    }
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| value.get(*k))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn status_field(value: &Value) -> Result<FriendshipStatus, ProtocolError> {
    let raw = value
        .get("status")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("status"))?;
    FriendshipStatus::parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_friend_shape() {
        let update = FriendshipUpdate::from_value(&json!({
            "friend": { "id": 5, "username": "dave" },
            "status": "accepted"
        }))
        .unwrap();
        assert_eq!(update.user_id, UserId(5));
        assert_eq!(update.username.as_deref(), Some("dave"));
        assert_eq!(update.status, FriendshipStatus::Accepted);
    }

    #[test]
    fn test_flat_shape_with_string_id() {
        let update = FriendshipUpdate::from_value(&json!({
            "user_id": "9",
            "status": "Pending"
        }))
        .unwrap();
        assert_eq!(update.user_id, UserId(9));
        assert_eq!(update.username, None);
        assert_eq!(update.status, FriendshipStatus::Pending);
    }

    #[test]
    fn test_friendship_wrapper_shape() {
        let update = FriendshipUpdate::from_value(&json!({
            "friendship": { "friendId": 4, "friendUsername": "erin", "status": "declined" }
        }))
        .unwrap();
        assert_eq!(update.user_id, UserId(4));
        assert_eq!(update.status, FriendshipStatus::Removed);
    }

    #[test]
    fn test_rejects_unknown_shapes() {
        assert!(matches!(
            FriendshipUpdate::from_value(&json!({ "something": 1 })),
            Err(ProtocolError::UnknownShape(_))
        ));
        assert!(matches!(
            FriendshipUpdate::from_value(&json!({ "userId": 1, "status": "frenemies" })),
            Err(ProtocolError::InvalidField { field: "status", .. })
        ));
        assert!(matches!(
            FriendshipUpdate::from_value(&json!({ "userId": 1 })),
            Err(ProtocolError::MissingField("status"))
        ));
    }
}
