//! # kizuna-db
//!
//! Storage layer: PostgreSQL repositories via SQLx and an in-memory store
//! implementing the same traits.
//!
//! ```rust,ignore
//! use kizuna_db::{create_pool, run_migrations, DatabaseConfig, PgMessageRepository};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! run_migrations(&pool).await?;
//! let messages = PgMessageRepository::new(pool);
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

pub use memory::{MemorySeed, MemoryStore};
pub use pool::{create_pool, run_migrations, DatabaseConfig, PgPool};
pub use repositories::{
    PgMessageRepository, PgPresenceRepository, PgRoomRepository, PgUserRepository,
};
