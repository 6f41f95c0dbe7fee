//! Durable presence record

use chrono::{DateTime, Utc};

use crate::value_objects::Snowflake;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceRecord {
    pub user_id: Snowflake,
    pub online: bool,
    pub last_seen: DateTime<Utc>,
}

impl PresenceRecord {
    pub fn online(user_id: Snowflake, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            online: true,
            last_seen: at,
        }
    }

    pub fn offline(user_id: Snowflake, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            online: false,
            last_seen: at,
        }
    }
}
