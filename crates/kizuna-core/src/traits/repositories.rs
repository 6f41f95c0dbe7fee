//! Repository traits (ports) - the durable collaborators of the realtime core
//!
//! The domain layer defines what it needs; `kizuna-db` and `kizuna-cache`
//! provide PostgreSQL, Redis and in-memory implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{MemberRole, Message, PresenceRecord, ReadReceipt, Room, UserProfile};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user's profile snapshot by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<UserProfile>>;

    /// Resolve a username (case-insensitive) to a user ID
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<Snowflake>>;
}

// ============================================================================
// Room Repository
// ============================================================================

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Find room by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Room>>;

    /// The user's role in the room, `None` when not a member.
    ///
    /// For channels this is the user's membership of the owning server;
    /// for conversations, participants are plain members.
    async fn membership(&self, room_id: Snowflake, user_id: Snowflake)
        -> RepoResult<Option<MemberRole>>;

    /// Every user allowed to read the room
    async fn member_ids(&self, room_id: Snowflake) -> RepoResult<Vec<Snowflake>>;

    /// Every room the user may join, used to seed clients after connect
    async fn rooms_for_user(&self, user_id: Snowflake) -> RepoResult<Vec<Snowflake>>;
}

// ============================================================================
// Message Repository
// ============================================================================

/// Pagination options for message history
#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    pub before: Option<Snowflake>,
    pub after: Option<Snowflake>,
    pub limit: i64,
}

impl MessageQuery {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 100;

    pub fn latest(limit: i64) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Limit clamped to `1..=MAX_LIMIT`, zero meaning the default
    pub fn effective_limit(&self) -> i64 {
        if self.limit <= 0 {
            Self::DEFAULT_LIMIT
        } else {
            self.limit.min(Self::MAX_LIMIT)
        }
    }
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a new message
    async fn create(&self, message: &Message) -> RepoResult<()>;

    /// Find message by ID (deleted messages included)
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>>;

    /// Page through a room's history, newest first unless `after` is set.
    /// Deleted messages are skipped.
    async fn find_by_room(&self, room_id: Snowflake, query: MessageQuery)
        -> RepoResult<Vec<Message>>;

    /// Store an edited body
    async fn update_content(&self, message: &Message) -> RepoResult<()>;

    /// Soft delete
    async fn mark_deleted(&self, id: Snowflake) -> RepoResult<()>;

    /// Append a read receipt; repeated reads by the same user are kept once
    async fn append_read_receipt(&self, receipt: &ReadReceipt) -> RepoResult<()>;

    /// Update the room's last-message preview and timestamp
    async fn update_room_summary(
        &self,
        room_id: Snowflake,
        preview: &str,
        at: DateTime<Utc>,
    ) -> RepoResult<()>;
}

// ============================================================================
// Presence Repository
// ============================================================================

#[async_trait]
pub trait PresenceRepository: Send + Sync {
    /// Write the user's durable online flag and last-seen time
    async fn save(&self, record: &PresenceRecord) -> RepoResult<()>;

    /// Read the durable record, if any
    async fn find(&self, user_id: Snowflake) -> RepoResult<Option<PresenceRecord>>;
}
