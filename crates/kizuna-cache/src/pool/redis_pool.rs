//! Pooled Redis connections for presence records.

use deadpool_redis::{Config, Pool, Runtime};

/// Where presence records live and how many connections may hold them
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    pub url: String,
    pub max_connections: usize,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 10,
        }
    }
}

impl From<&kizuna_common::RedisConfig> for RedisPoolConfig {
    fn from(config: &kizuna_common::RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections as usize,
        }
    }
}

impl RedisPoolConfig {
    /// The URL with any `user:password@` part removed, for logs
    pub fn redacted_url(&self) -> &str {
        match self.url.rsplit_once('@') {
            Some((_, host)) => host,
            None => &self.url,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("Invalid Redis pool settings: {0}")]
    Build(String),

    #[error("No Redis connection available: {0}")]
    Checkout(#[from] deadpool_redis::PoolError),

    #[error("Redis command failed: {0}")]
    Command(#[from] redis::RedisError),
}

pub type RedisResult<T> = Result<T, RedisPoolError>;

/// Cloneable handle to a deadpool of Redis connections
#[derive(Clone)]
pub struct RedisPool {
    inner: Pool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.inner.status();
        f.debug_struct("RedisPool")
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}

impl RedisPool {
    /// Build the pool. Connections are opened lazily on first checkout.
    pub fn new(config: RedisPoolConfig) -> RedisResult<Self> {
        let inner = Config::from_url(config.url.as_str())
            .builder()
            .map_err(|e| RedisPoolError::Build(e.to_string()))?
            .max_size(config.max_connections.max(1))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| RedisPoolError::Build(e.to_string()))?;

        tracing::debug!(
            url = %config.redacted_url(),
            max_connections = config.max_connections,
            "Redis pool built"
        );
        Ok(Self { inner })
    }

    pub async fn get(&self) -> RedisResult<deadpool_redis::Connection> {
        Ok(self.inner.get().await?)
    }

    pub fn max_size(&self) -> usize {
        self.inner.status().max_size
    }

    /// Round-trip a `PING`; used at startup to fail fast on a bad URL
    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
