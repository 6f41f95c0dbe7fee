//! # kizuna-common
//!
//! Shared plumbing: configuration, credential verification, application
//! errors and tracing setup.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

pub use auth::{extract_token, Claims, JwtService, TokenType};
pub use config::{
    AppConfig, AppSettings, ConfigError, DatabaseConfig, Environment, JwtConfig,
    NotificationConfig, RealtimeConfig, RedisConfig, ServerConfig, SnowflakeConfig, StoreBackend,
    StoreConfig,
};
pub use error::{AppError, AppResult};
pub use telemetry::{
    try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError,
};
