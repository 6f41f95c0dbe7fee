//! Presence storage module.

mod redis_presence;

pub use redis_presence::RedisPresenceRepository;
