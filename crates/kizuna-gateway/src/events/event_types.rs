//! Gateway event types
//!
//! Names carried in the `t` field of dispatch messages.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEventType {
    /// Sent after successful Identify
    Ready,

    // Room subscription acknowledgements
    RoomJoined,
    RoomLeft,

    // Message events
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    MessageRead,
    /// A send/edit/delete/read was rejected; only the issuing connection sees it
    MessageError,

    // Ephemeral
    TypingStart,
    TypingStop,

    /// A user came online or went offline
    PresenceUpdate,
}

impl GatewayEventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::RoomJoined => "ROOM_JOINED",
            Self::RoomLeft => "ROOM_LEFT",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageUpdate => "MESSAGE_UPDATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::MessageRead => "MESSAGE_READ",
            Self::MessageError => "MESSAGE_ERROR",
            Self::TypingStart => "TYPING_START",
            Self::TypingStop => "TYPING_STOP",
            Self::PresenceUpdate => "PRESENCE_UPDATE",
        }
    }

    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "READY" => Some(Self::Ready),
            "ROOM_JOINED" => Some(Self::RoomJoined),
            "ROOM_LEFT" => Some(Self::RoomLeft),
            "MESSAGE_CREATE" => Some(Self::MessageCreate),
            "MESSAGE_UPDATE" => Some(Self::MessageUpdate),
            "MESSAGE_DELETE" => Some(Self::MessageDelete),
            "MESSAGE_READ" => Some(Self::MessageRead),
            "MESSAGE_ERROR" => Some(Self::MessageError),
            "TYPING_START" => Some(Self::TypingStart),
            "TYPING_STOP" => Some(Self::TypingStop),
            "PRESENCE_UPDATE" => Some(Self::PresenceUpdate),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<GatewayEventType> for String {
    fn from(event: GatewayEventType) -> Self {
        event.as_str().to_string()
    }
}
