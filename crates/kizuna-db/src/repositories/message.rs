//! PostgreSQL implementation of MessageRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kizuna_core::{Message, MessageQuery, MessageRepository, ReadReceipt, RepoResult, Snowflake};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::instrument;

use crate::models::MessageModel;

use super::error::{map_db_error, message_not_found};

const MESSAGE_COLUMNS: &str =
    "id, room_id, author_id, content, attachments, mentions, reply_to_id, created_at, edited_at, deleted_at";

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self, message), fields(message_id = %message.id, room_id = %message.room_id))]
    async fn create(&self, message: &Message) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, room_id, author_id, content, attachments, mentions, reply_to_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.id.into_inner())
        .bind(message.room_id.into_inner())
        .bind(message.author_id.into_inner())
        .bind(&message.content)
        .bind(Json(&message.attachments))
        .bind(Json(&message.mentions))
        .bind(message.reply_to_id.map(Snowflake::into_inner))
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        let result = sqlx::query_as::<_, MessageModel>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(Message::from))
    }

    #[instrument(skip(self))]
    async fn find_by_room(
        &self,
        room_id: Snowflake,
        query: MessageQuery,
    ) -> RepoResult<Vec<Message>> {
        let limit = query.effective_limit();

        let results = match (query.before, query.after) {
            (Some(before), _) => {
                // Scrolling up
                let sql = format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages \
                     WHERE room_id = $1 AND id < $2 AND deleted_at IS NULL \
                     ORDER BY id DESC LIMIT $3"
                );
                sqlx::query_as::<_, MessageModel>(&sql)
                    .bind(room_id.into_inner())
                    .bind(before.into_inner())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
            }
            (None, Some(after)) => {
                // Catching up after a reconnect
                let sql = format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages \
                     WHERE room_id = $1 AND id > $2 AND deleted_at IS NULL \
                     ORDER BY id ASC LIMIT $3"
                );
                sqlx::query_as::<_, MessageModel>(&sql)
                    .bind(room_id.into_inner())
                    .bind(after.into_inner())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
            }
            (None, None) => {
                let sql = format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages \
                     WHERE room_id = $1 AND deleted_at IS NULL \
                     ORDER BY id DESC LIMIT $2"
                );
                sqlx::query_as::<_, MessageModel>(&sql)
                    .bind(room_id.into_inner())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Message::from).collect())
    }

    #[instrument(skip(self, message), fields(message_id = %message.id))]
    async fn update_content(&self, message: &Message) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET content = $2, mentions = $3, edited_at = COALESCE($4, NOW())
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(message.id.into_inner())
        .bind(&message.content)
        .bind(Json(&message.mentions))
        .bind(message.edited_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(message_not_found(message.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn mark_deleted(&self, id: Snowflake) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET deleted_at = NOW(), content = '', attachments = '[]'::jsonb, mentions = '[]'::jsonb
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(message_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn append_read_receipt(&self, receipt: &ReadReceipt) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO read_receipts (message_id, user_id, room_id, read_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(receipt.message_id.into_inner())
        .bind(receipt.user_id.into_inner())
        .bind(receipt.room_id.into_inner())
        .bind(receipt.read_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, preview))]
    async fn update_room_summary(
        &self,
        room_id: Snowflake,
        preview: &str,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        // Guarded so a late background write never rewinds the summary
        sqlx::query(
            r#"
            UPDATE rooms
            SET last_message_preview = $2, last_message_at = $3
            WHERE id = $1 AND (last_message_at IS NULL OR last_message_at <= $3)
            "#,
        )
        .bind(room_id.into_inner())
        .bind(preview)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}
