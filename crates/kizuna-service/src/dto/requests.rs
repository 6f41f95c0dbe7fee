//! Request DTOs for message commands

use kizuna_core::{Attachment, Snowflake};
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

/// Payload of a `MessageSend` command
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub room_id: Snowflake,

    #[serde(default)]
    #[validate(length(max = 2000, message = "Message content must be at most 2000 characters"))]
    pub content: String,

    #[serde(default)]
    #[validate(length(max = 10, message = "A message can carry at most 10 attachments"))]
    pub attachments: Vec<Attachment>,

    #[serde(default)]
    pub reply_to_id: Option<Snowflake>,

    /// Client-chosen correlation value, echoed back untouched
    #[serde(default)]
    pub nonce: Option<String>,
}

impl SendMessageRequest {
    pub fn text(room_id: Snowflake, content: impl Into<String>) -> Self {
        Self {
            room_id,
            content: content.into(),
            attachments: Vec::new(),
            reply_to_id: None,
            nonce: None,
        }
    }

    /// True when there is nothing to deliver once whitespace is ignored
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty() && self.attachments.is_empty()
    }
}

/// Payload of a `MessageEdit` command
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EditMessageRequest {
    pub message_id: Snowflake,

    #[validate(length(max = 2000, message = "Message content must be at most 2000 characters"))]
    pub content: String,

    #[serde(default)]
    pub nonce: Option<String>,
}

/// First human-readable message out of a validation failure
pub fn validation_reason(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(ToString::to_string))
        .unwrap_or_else(|| errors.to_string())
}
