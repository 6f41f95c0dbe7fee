//! Client payload definitions
//!
//! Shapes of the `d` field for each client op. Message send and edit reuse
//! the request DTOs from the service layer.

use kizuna_core::Snowflake;
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Default heartbeat interval (45 seconds)
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 45_000;

    #[must_use]
    pub fn new() -> Self {
        Self {
            heartbeat_interval: Self::DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Bearer credential, with or without the `Bearer ` prefix
    pub token: String,
}

/// Payload for room join/leave and typing ops
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoomPayload {
    pub room_id: Snowflake,
}

/// Payload for read receipts and deletes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRefPayload {
    pub message_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}
