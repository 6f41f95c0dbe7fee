//! PostgreSQL implementation of PresenceRepository
//!
//! Writes the `online` and `last_seen_at` columns of the user record. Used
//! when no Redis instance is configured.

use async_trait::async_trait;
use kizuna_core::{PresenceRecord, PresenceRepository, RepoResult, Snowflake};
use sqlx::PgPool;
use tracing::instrument;

use crate::models::PresenceModel;

use super::error::map_db_error;

#[derive(Clone)]
pub struct PgPresenceRepository {
    pool: PgPool,
}

impl PgPresenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PresenceRepository for PgPresenceRepository {
    #[instrument(skip(self))]
    async fn save(&self, record: &PresenceRecord) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET online = $2, last_seen_at = $3
            WHERE id = $1
            "#,
        )
        .bind(record.user_id.into_inner())
        .bind(record.online)
        .bind(record.last_seen)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find(&self, user_id: Snowflake) -> RepoResult<Option<PresenceRecord>> {
        let result = sqlx::query_as::<_, PresenceModel>(
            r#"
            SELECT id, online, last_seen_at
            FROM users
            WHERE id = $1 AND last_seen_at IS NOT NULL
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(PresenceRecord::from))
    }
}
