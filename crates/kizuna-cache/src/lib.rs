//! # kizuna-cache
//!
//! Redis layer for the realtime broker.
//!
//! - **Connection Pool**: managed Redis connections via deadpool
//! - **Presence**: durable online flag and last-seen time, shared by every
//!   gateway worker pointed at the same Redis
//!
//! ## Example
//!
//! ```ignore
//! use kizuna_cache::{RedisPool, RedisPoolConfig, RedisPresenceRepository};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let presence = RedisPresenceRepository::new(pool);
//! presence.save(&PresenceRecord::online(user_id, Utc::now())).await?;
//! ```

pub mod pool;
pub mod presence;

pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};
pub use presence::RedisPresenceRepository;
