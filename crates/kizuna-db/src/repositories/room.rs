//! PostgreSQL implementation of RoomRepository

use async_trait::async_trait;
use kizuna_core::{MemberRole, RepoResult, Room, RoomRepository, Snowflake};
use sqlx::PgPool;
use tracing::instrument;

use crate::models::RoomModel;

use super::error::map_db_error;

#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Room>> {
        let result = sqlx::query_as::<_, RoomModel>(
            r#"
            SELECT r.id, r.kind, r.server_id, r.name, r.flags,
                   r.last_message_preview, r.last_message_at, r.created_at,
                   ARRAY(
                       SELECT cp.user_id FROM conversation_participants cp
                       WHERE cp.room_id = r.id
                       ORDER BY cp.user_id
                   ) AS participants
            FROM rooms r
            WHERE r.id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Room::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn membership(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<MemberRole>> {
        let role = sqlx::query_scalar::<_, Option<i16>>(
            r#"
            SELECT CASE
                WHEN r.kind = 1 THEN (
                    SELECT 0::SMALLINT FROM conversation_participants cp
                    WHERE cp.room_id = r.id AND cp.user_id = $2
                )
                ELSE (
                    SELECT sm.role FROM server_members sm
                    WHERE sm.server_id = r.server_id AND sm.user_id = $2
                )
            END
            FROM rooms r
            WHERE r.id = $1
            "#,
        )
        .bind(room_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(role.flatten().map(MemberRole::from))
    }

    #[instrument(skip(self))]
    async fn member_ids(&self, room_id: Snowflake) -> RepoResult<Vec<Snowflake>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT cp.user_id FROM conversation_participants cp WHERE cp.room_id = $1
            UNION
            SELECT sm.user_id FROM rooms r
            JOIN server_members sm ON sm.server_id = r.server_id
            WHERE r.id = $1
            "#,
        )
        .bind(room_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids.into_iter().map(Snowflake::new).collect())
    }

    #[instrument(skip(self))]
    async fn rooms_for_user(&self, user_id: Snowflake) -> RepoResult<Vec<Snowflake>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT cp.room_id FROM conversation_participants cp WHERE cp.user_id = $1
            UNION
            SELECT r.id FROM rooms r
            JOIN server_members sm ON sm.server_id = r.server_id
            WHERE sm.user_id = $1
            ORDER BY 1
            "#,
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids.into_iter().map(Snowflake::new).collect())
    }
}
