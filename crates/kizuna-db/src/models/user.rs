//! User database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Profile columns of the users table
#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Presence columns of the users table
#[derive(Debug, Clone, FromRow)]
pub struct PresenceModel {
    pub id: i64,
    pub online: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
}
