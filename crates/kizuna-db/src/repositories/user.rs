//! PostgreSQL implementation of UserRepository

use async_trait::async_trait;
use kizuna_core::{RepoResult, Snowflake, UserProfile, UserRepository};
use sqlx::PgPool;
use tracing::instrument;

use crate::models::UserModel;

use super::error::map_db_error;

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<UserProfile>> {
        let result = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT id, username, display_name, avatar_url
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(UserProfile::from))
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<Snowflake>> {
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM users
            WHERE LOWER(username) = LOWER($1) AND deleted_at IS NULL
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Snowflake::new))
    }
}
