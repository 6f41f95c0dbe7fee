//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::Snowflake;

#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(Snowflake),

    #[error("Room not found: {0}")]
    RoomNotFound(Snowflake),

    #[error("Message not found: {0}")]
    MessageNotFound(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Message has no content or attachments")]
    EmptyMessage,

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    #[error("Too many attachments: max {max}")]
    TooManyAttachments { max: usize },

    #[error("Reply target belongs to another room")]
    ReplyOutsideRoom,

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Not a member of this room")]
    NotRoomMember,

    #[error("Cannot send messages in this room")]
    CannotSendMessages,

    #[error("Not message author")]
    NotMessageAuthor,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Notification error: {0}")]
    NotificationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Stable error code string for clients and logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::RoomNotFound(_) => "UNKNOWN_ROOM",
            Self::MessageNotFound(_) => "UNKNOWN_MESSAGE",

            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::EmptyMessage => "EMPTY_MESSAGE",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::TooManyAttachments { .. } => "TOO_MANY_ATTACHMENTS",
            Self::ReplyOutsideRoom => "REPLY_OUTSIDE_ROOM",

            Self::NotRoomMember => "NOT_ROOM_MEMBER",
            Self::CannotSendMessages => "CANNOT_SEND_MESSAGES",
            Self::NotMessageAuthor => "NOT_MESSAGE_AUTHOR",

            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::CacheError(_) => "CACHE_ERROR",
            Self::NotificationError(_) => "NOTIFICATION_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_) | Self::RoomNotFound(_) | Self::MessageNotFound(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::EmptyMessage
                | Self::ContentTooLong { .. }
                | Self::TooManyAttachments { .. }
                | Self::ReplyOutsideRoom
        )
    }

    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::NotRoomMember | Self::CannotSendMessages | Self::NotMessageAuthor
        )
    }

    /// Failures of a backing store or side channel rather than of the request
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_)
                | Self::CacheError(_)
                | Self::NotificationError(_)
                | Self::InternalError(_)
        )
    }
}
