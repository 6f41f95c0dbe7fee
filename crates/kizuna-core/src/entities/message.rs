//! Message entity - a chat message posted to a room

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{Mention, Snowflake};

/// Maximum message body length, in characters
pub const MAX_CONTENT_LENGTH: usize = 2000;

/// Maximum attachments per message
pub const MAX_ATTACHMENTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Snowflake,
    pub room_id: Snowflake,
    pub author_id: Snowflake,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub mentions: Vec<Mention>,
    pub reply_to_id: Option<Snowflake>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

impl Message {
    pub fn new(id: Snowflake, room_id: Snowflake, author_id: Snowflake, content: String) -> Self {
        Self {
            id,
            room_id,
            author_id,
            content,
            attachments: Vec::new(),
            mentions: Vec::new(),
            reply_to_id: None,
            created_at: Utc::now(),
            edited_at: None,
            deleted: false,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_mentions(mut self, mentions: Vec<Mention>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn with_reply_to(mut self, reply_to_id: Option<Snowflake>) -> Self {
        self.reply_to_id = reply_to_id;
        self
    }

    #[inline]
    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }

    #[inline]
    pub fn is_reply(&self) -> bool {
        self.reply_to_id.is_some()
    }

    /// True when there is neither visible text nor an attachment.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.attachments.is_empty()
    }

    pub fn mentions_user(&self, user_id: Snowflake) -> bool {
        self.mentions.iter().any(|m| m.user_id == user_id)
    }

    pub fn edit(&mut self, content: String, mentions: Vec<Mention>) {
        self.content = content;
        self.mentions = mentions;
        self.edited_at = Some(Utc::now());
    }

    /// Soft delete: the row stays for receipts and reply chains, the body goes.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
        self.content.clear();
        self.attachments.clear();
        self.mentions.clear();
    }

    /// Body truncated to `max_chars` characters, with an ellipsis when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        truncate_preview(self.content.trim(), max_chars)
    }
}

/// Truncate `text` to `max_chars` characters, appending an ellipsis when cut.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
    }
}

/// File attached to a message. Uploads happen elsewhere; the relay only sees URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: None,
            content_type: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// Record that a user has seen a message. Appended, never replaces content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadReceipt {
    pub message_id: Snowflake,
    pub room_id: Snowflake,
    pub user_id: Snowflake,
    pub read_at: DateTime<Utc>,
}
