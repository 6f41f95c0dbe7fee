//! Message database model

use chrono::{DateTime, Utc};
use kizuna_core::{Attachment, Mention};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: i64,
    pub room_id: i64,
    pub author_id: i64,
    pub content: String,
    pub attachments: Json<Vec<Attachment>>,
    pub mentions: Json<Vec<Mention>>,
    pub reply_to_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MessageModel {
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
