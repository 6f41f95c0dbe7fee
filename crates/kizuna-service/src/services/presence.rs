//! Presence service
//!
//! Writes the durable online flag and last-seen time. Failures are logged
//! and swallowed so connection lifecycle never waits on the store.

use chrono::{DateTime, Utc};
use kizuna_core::{PresenceRecord, Snowflake};
use tracing::{debug, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

pub struct PresenceService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PresenceService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Record the user as online. Returns whether the write succeeded.
    pub async fn mark_online(&self, user_id: Snowflake, at: DateTime<Utc>) -> bool {
        self.save(PresenceRecord::online(user_id, at)).await
    }

    /// Record the user as offline, last seen at `at`
    pub async fn mark_offline(&self, user_id: Snowflake, at: DateTime<Utc>) -> bool {
        self.save(PresenceRecord::offline(user_id, at)).await
    }

    /// Bump last-seen for a user who still has other connections open
    pub async fn touch(&self, user_id: Snowflake, at: DateTime<Utc>) -> bool {
        self.save(PresenceRecord::online(user_id, at)).await
    }

    pub async fn get(&self, user_id: Snowflake) -> ServiceResult<Option<PresenceRecord>> {
        self.ctx
            .presence_repo()
            .find(user_id)
            .await
            .map_err(|e| ServiceError::internal(e.to_string()))
    }

    async fn save(&self, record: PresenceRecord) -> bool {
        match self.ctx.presence_repo().save(&record).await {
            Ok(()) => {
                debug!(user_id = %record.user_id, online = record.online, "Presence stored");
                true
            }
            Err(e) => {
                warn!(user_id = %record.user_id, error = %e, "Failed to store presence");
                false
            }
        }
    }
}
