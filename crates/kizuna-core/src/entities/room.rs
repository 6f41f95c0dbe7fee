//! Rooms and membership
//!
//! A room is either a channel inside a community server or a one-to-one
//! conversation. Both share the same subscription and fan-out machinery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{RoomFlags, Snowflake};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKind {
    /// Channel inside a community server
    Channel { server_id: Snowflake },
    /// Private conversation between two users
    Conversation { participants: [Snowflake; 2] },
}

impl RoomKind {
    #[inline]
    pub fn is_channel(&self) -> bool {
        matches!(self, Self::Channel { .. })
    }

    pub fn server_id(&self) -> Option<Snowflake> {
        match self {
            Self::Channel { server_id } => Some(*server_id),
            Self::Conversation { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: Snowflake,
    pub kind: RoomKind,
    pub name: Option<String>,
    pub flags: RoomFlags,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new_channel(id: Snowflake, server_id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id,
            kind: RoomKind::Channel { server_id },
            name: Some(name.into()),
            flags: RoomFlags::default(),
            last_message_preview: None,
            last_message_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn new_conversation(id: Snowflake, a: Snowflake, b: Snowflake) -> Self {
        Self {
            id,
            kind: RoomKind::Conversation {
                participants: [a, b],
            },
            name: None,
            flags: RoomFlags::default(),
            last_message_preview: None,
            last_message_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_flags(mut self, flags: RoomFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn is_channel(&self) -> bool {
        self.kind.is_channel()
    }

    pub fn is_participant(&self, user_id: Snowflake) -> bool {
        match self.kind {
            RoomKind::Conversation { participants } => participants.contains(&user_id),
            RoomKind::Channel { .. } => false,
        }
    }

    /// Record the latest message summary shown in room lists.
    pub fn set_summary(&mut self, preview: String, at: DateTime<Utc>) {
        self.last_message_preview = Some(preview);
        self.last_message_at = Some(at);
    }
}

/// Role a user holds in a room (or the server that owns a channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum MemberRole {
    #[default]
    Member = 0,
    Moderator = 1,
    Owner = 2,
}

impl MemberRole {
    /// Moderators and owners bypass the member-chat flag and may remove
    /// other people's messages.
    #[inline]
    pub fn can_moderate(self) -> bool {
        self >= Self::Moderator
    }

    #[inline]
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

impl From<i16> for MemberRole {
    fn from(value: i16) -> Self {
        match value {
            2 => Self::Owner,
            1 => Self::Moderator,
            _ => Self::Member,
        }
    }
}
