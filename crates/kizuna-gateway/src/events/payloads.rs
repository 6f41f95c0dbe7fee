//! Event payload definitions
//!
//! Data carried in `d` for each dispatch event.

use chrono::{DateTime, Utc};
use kizuna_core::{Attachment, Mention, Message, ReadReceipt, Snowflake, UserProfile};
use kizuna_service::ServiceError;
use serde::{Deserialize, Serialize};

/// Gateway protocol version reported in READY
pub const GATEWAY_VERSION: i32 = 1;

// === Connection Events ===

/// READY event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    pub v: i32,
    pub session_id: String,
    pub user: UserPayload,
    /// Rooms the user belongs to; the client joins the ones it wants live traffic for
    pub rooms: Vec<Snowflake>,
}

/// Profile snapshot denormalized into events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Snowflake,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<&UserProfile> for UserPayload {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id,
            username: profile.username.clone(),
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

// === Room Events ===

/// ROOM_JOINED / ROOM_LEFT payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoomEvent {
    pub room_id: Snowflake,
}

// === Message Events ===

/// MESSAGE_CREATE / MESSAGE_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: Snowflake,
    pub room_id: Snowflake,
    pub author: UserPayload,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<Mention>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<Snowflake>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    /// Echo of the client's nonce so the sender can match its pending message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl MessagePayload {
    pub fn new(message: &Message, author: &UserProfile, nonce: Option<String>) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            author: UserPayload::from(author),
            content: message.content.clone(),
            attachments: message.attachments.clone(),
            mentions: message.mentions.clone(),
            reply_to_id: message.reply_to_id,
            created_at: message.created_at,
            edited_at: message.edited_at,
            nonce,
        }
    }
}

/// MESSAGE_DELETE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub room_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// MESSAGE_READ payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReadEvent {
    pub message_id: Snowflake,
    pub room_id: Snowflake,
    pub user_id: Snowflake,
    pub read_at: DateTime<Utc>,
}

impl From<&ReadReceipt> for MessageReadEvent {
    fn from(receipt: &ReadReceipt) -> Self {
        Self {
            message_id: receipt.message_id,
            room_id: receipt.room_id,
            user_id: receipt.user_id,
            read_at: receipt.read_at,
        }
    }
}

/// MESSAGE_ERROR payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageErrorEvent {
    /// Stable machine-readable code, e.g. `FORBIDDEN`
    pub reason: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl MessageErrorEvent {
    pub const RATE_LIMITED: &'static str = "RATE_LIMITED";

    pub fn from_error(error: &ServiceError, nonce: Option<String>) -> Self {
        Self {
            reason: error.code().to_string(),
            message: error.to_string(),
            nonce,
        }
    }

    pub fn rate_limited(nonce: Option<String>) -> Self {
        Self {
            reason: Self::RATE_LIMITED.to_string(),
            message: "Too many commands, slow down".to_string(),
            nonce,
        }
    }
}

// === Ephemeral Events ===

/// TYPING_START / TYPING_STOP payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingEvent {
    pub room_id: Snowflake,
    pub user_id: Snowflake,
    pub timestamp: DateTime<Utc>,
}

/// PRESENCE_UPDATE payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub user_id: Snowflake,
    pub online: bool,
    /// Only set when the user went offline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl PresenceEvent {
    pub fn online(user_id: Snowflake) -> Self {
        Self {
            user_id,
            online: true,
            last_seen: None,
        }
    }

    pub fn offline(user_id: Snowflake, last_seen: DateTime<Utc>) -> Self {
        Self {
            user_id,
            online: false,
            last_seen: Some(last_seen),
        }
    }
}
