//! Durable presence records in Redis.
//!
//! Each user is a hash at `presence:{user_id}` holding `online` (`0`/`1`)
//! and `last_seen` (Unix millis). Records carry no TTL: the gateway writes
//! an explicit offline record when the last connection closes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use kizuna_core::{DomainError, PresenceRecord, PresenceRepository, RepoResult, Snowflake};
use redis::AsyncCommands;

use crate::pool::{RedisPool, RedisPoolError};

const PRESENCE_PREFIX: &str = "presence:";
const FIELD_ONLINE: &str = "online";
const FIELD_LAST_SEEN: &str = "last_seen";

/// Redis implementation of [`PresenceRepository`]
#[derive(Clone, Debug)]
pub struct RedisPresenceRepository {
    pool: RedisPool,
}

impl RedisPresenceRepository {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn presence_key(user_id: Snowflake) -> String {
        format!("{PRESENCE_PREFIX}{user_id}")
    }

    fn decode(user_id: Snowflake, fields: &HashMap<String, String>) -> Option<PresenceRecord> {
        let online = fields.get(FIELD_ONLINE)? == "1";
        let millis: i64 = fields.get(FIELD_LAST_SEEN)?.parse().ok()?;
        let last_seen: DateTime<Utc> = Utc.timestamp_millis_opt(millis).single()?;
        Some(PresenceRecord {
            user_id,
            online,
            last_seen,
        })
    }
}

fn cache_error(e: RedisPoolError) -> DomainError {
    DomainError::CacheError(e.to_string())
}

#[async_trait]
impl PresenceRepository for RedisPresenceRepository {
    async fn save(&self, record: &PresenceRecord) -> RepoResult<()> {
        let key = Self::presence_key(record.user_id);
        let mut conn = self.pool.get().await.map_err(cache_error)?;

        let online = if record.online { "1" } else { "0" };
        let last_seen = record.last_seen.timestamp_millis().to_string();
        conn.hset_multiple::<_, _, _, ()>(
            &key,
            &[(FIELD_ONLINE, online), (FIELD_LAST_SEEN, last_seen.as_str())],
        )
        .await
        .map_err(|e| cache_error(e.into()))?;

        tracing::debug!(user_id = %record.user_id, online = record.online, "Saved presence");
        Ok(())
    }

    async fn find(&self, user_id: Snowflake) -> RepoResult<Option<PresenceRecord>> {
        let key = Self::presence_key(user_id);
        let mut conn = self.pool.get().await.map_err(cache_error)?;

        let fields: HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .map_err(|e| cache_error(e.into()))?;

        if fields.is_empty() {
            return Ok(None);
        }

        let record = Self::decode(user_id, &fields);
        if record.is_none() {
            tracing::warn!(user_id = %user_id, "Discarding malformed presence hash");
        }
        Ok(record)
    }
}
