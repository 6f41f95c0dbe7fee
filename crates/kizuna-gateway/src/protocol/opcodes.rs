//! Gateway operation codes

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Operation codes carried in the `op` field of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Server dispatches an event to the client (server only)
    Dispatch = 0,
    /// Keep-alive (client only, answered with `HeartbeatAck`)
    Heartbeat = 1,
    /// Present a credential (client only, exactly once)
    Identify = 2,
    /// Subscribe to a room's live traffic
    RoomJoin = 3,
    /// Unsubscribe from a room
    RoomLeave = 4,
    /// Post a message to a joined room
    MessageSend = 5,
    TypingStart = 6,
    TypingStop = 7,
    /// Record a read receipt
    MessageRead = 8,
    MessageEdit = 9,
    /// Sent on connect with the heartbeat interval (server only)
    Hello = 10,
    /// Heartbeat acknowledged (server only)
    HeartbeatAck = 11,
    MessageDelete = 12,
}

impl OpCode {
    /// Create an `OpCode` from a raw integer value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            3 => Some(Self::RoomJoin),
            4 => Some(Self::RoomLeave),
            5 => Some(Self::MessageSend),
            6 => Some(Self::TypingStart),
            7 => Some(Self::TypingStop),
            8 => Some(Self::MessageRead),
            9 => Some(Self::MessageEdit),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            12 => Some(Self::MessageDelete),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if this op code can be sent by the client
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        !self.is_server_op()
    }

    /// Check if this op code can be sent by the server
    #[must_use]
    pub const fn is_server_op(self) -> bool {
        matches!(self, Self::Dispatch | Self::Hello | Self::HeartbeatAck)
    }

    /// Commands that count against the per-connection rate limit
    #[must_use]
    pub const fn is_rate_limited(self) -> bool {
        matches!(
            self,
            Self::MessageSend
                | Self::MessageEdit
                | Self::MessageDelete
                | Self::MessageRead
                | Self::TypingStart
                | Self::TypingStop
        )
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch",
            Self::Heartbeat => "Heartbeat",
            Self::Identify => "Identify",
            Self::RoomJoin => "RoomJoin",
            Self::RoomLeave => "RoomLeave",
            Self::MessageSend => "MessageSend",
            Self::TypingStart => "TypingStart",
            Self::TypingStop => "TypingStop",
            Self::MessageRead => "MessageRead",
            Self::MessageEdit => "MessageEdit",
            Self::Hello => "Hello",
            Self::HeartbeatAck => "HeartbeatAck",
            Self::MessageDelete => "MessageDelete",
        }
    }
}

impl Serialize for OpCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid op code: {value}")))
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}
