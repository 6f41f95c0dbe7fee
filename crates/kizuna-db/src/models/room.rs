//! Room database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Row of the rooms table with conversation participants aggregated in
#[derive(Debug, Clone, FromRow)]
pub struct RoomModel {
    pub id: i64,
    pub kind: i16,
    pub server_id: Option<i64>,
    pub name: Option<String>,
    pub flags: i32,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<i64>,
}

impl RoomModel {
    pub const KIND_CHANNEL: i16 = 0;
    pub const KIND_CONVERSATION: i16 = 1;
}
