//! # kizuna-core
//!
//! Domain layer: entities, value objects and the collaborator traits the
//! realtime core talks to. No dependencies on infrastructure.

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

pub use entities::{
    truncate_preview, Attachment, MemberRole, Message, PresenceRecord, ReadReceipt, Room,
    RoomKind, UserProfile, MAX_ATTACHMENTS, MAX_CONTENT_LENGTH,
};
pub use error::DomainError;
pub use traits::{
    MessageQuery, MessageRepository, Notification, NotificationDispatcher, PresenceRepository,
    RepoResult, RoomRepository, UserRepository,
};
pub use value_objects::{
    extract_mention_names, Mention, RoomFlags, Snowflake, SnowflakeGenerator, SnowflakeParseError,
    MAX_MENTION_LEN,
};
