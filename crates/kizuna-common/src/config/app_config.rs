//! Application configuration
//!
//! Loaded from environment variables, with a `.env` file honoured when present.

use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub store: StoreConfig,
    pub database: Option<DatabaseConfig>,
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    pub snowflake: SnowflakeConfig,
    pub realtime: RealtimeConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" | "dev" => Some(Self::Development),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which implementation backs the message, user and room repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// Process-local maps; nothing survives a restart
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// JSON fixtures loaded into the memory backend at startup
    #[serde(default)]
    pub seed_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeConfig {
    #[serde(default)]
    pub worker_id: u16,
}

/// Connection lifecycle and fan-out tuning
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Interval advertised in Hello; silence for twice this closes the socket
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Time allowed between upgrade and a valid Identify
    #[serde(default = "default_auth_timeout_ms")]
    pub auth_timeout_ms: u64,
    /// Per-connection outbound queue capacity
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
    /// Subscribe new connections to every room they belong to
    #[serde(default)]
    pub auto_join_rooms: bool,
    /// Sustained send/typing commands per second per connection
    #[serde(default = "default_commands_per_second")]
    pub commands_per_second: u32,
    #[serde(default = "default_command_burst")]
    pub command_burst: u32,
}

impl RealtimeConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            auth_timeout_ms: default_auth_timeout_ms(),
            outbound_buffer: default_outbound_buffer(),
            auto_join_rooms: false,
            commands_per_second: default_commands_per_second(),
            command_burst: default_command_burst(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Upper bound on concurrently running background side tasks
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// POST target for push notifications; notifications are only logged when unset
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            webhook_url: None,
        }
    }
}

fn default_app_name() -> String {
    "kizuna-realtime".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_access_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_heartbeat_interval_ms() -> u64 {
    45_000
}

fn default_auth_timeout_ms() -> u64 {
    10_000
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_commands_per_second() -> u32 {
    10
}

fn default_command_burst() -> u32 {
    30
}

fn default_max_in_flight() -> usize {
    256
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: impl FnOnce() -> T) -> T {
    value.and_then(|s| s.parse().ok()).unwrap_or_else(default)
}

fn parse_bool(value: Option<String>) -> bool {
    value.is_some_and(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl AppConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("STORE_BACKEND") {
            None => StoreBackend::default(),
            Some(s) => match s.to_lowercase().as_str() {
                "postgres" | "postgresql" => StoreBackend::Postgres,
                "memory" => StoreBackend::Memory,
                _ => return Err(ConfigError::InvalidValue("STORE_BACKEND", s)),
            },
        };

        let database = match lookup("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(lookup("DATABASE_MAX_CONNECTIONS"), default_max_connections),
                min_connections: parse_or(lookup("DATABASE_MIN_CONNECTIONS"), default_min_connections),
            }),
            None if backend == StoreBackend::Postgres => {
                return Err(ConfigError::MissingVar("DATABASE_URL"))
            }
            None => None,
        };

        let redis = lookup("REDIS_URL").map(|url| RedisConfig {
            url,
            max_connections: parse_or(lookup("REDIS_MAX_CONNECTIONS"), default_redis_max_connections),
        });

        let env = match lookup("APP_ENV") {
            None => Environment::default(),
            Some(s) => Environment::parse(&s).ok_or(ConfigError::InvalidValue("APP_ENV", s))?,
        };

        let port = match lookup("GATEWAY_PORT") {
            None => return Err(ConfigError::MissingVar("GATEWAY_PORT")),
            Some(s) => s
                .parse()
                .map_err(|_| ConfigError::InvalidValue("GATEWAY_PORT", s))?,
        };

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            gateway: ServerConfig {
                host: lookup("GATEWAY_HOST").unwrap_or_else(default_host),
                port,
            },
            store: StoreConfig {
                backend,
                seed_file: lookup("MEMORY_SEED_FILE").filter(|s| !s.trim().is_empty()),
            },
            database,
            redis,
            jwt: JwtConfig {
                secret: lookup("JWT_SECRET").ok_or(ConfigError::MissingVar("JWT_SECRET"))?,
                access_token_expiry: parse_or(lookup("JWT_ACCESS_TOKEN_EXPIRY"), default_access_token_expiry),
            },
            snowflake: SnowflakeConfig {
                worker_id: parse_or(lookup("WORKER_ID"), || 0),
            },
            realtime: RealtimeConfig {
                heartbeat_interval_ms: parse_or(lookup("HEARTBEAT_INTERVAL_MS"), default_heartbeat_interval_ms),
                auth_timeout_ms: parse_or(lookup("AUTH_TIMEOUT_MS"), default_auth_timeout_ms),
                outbound_buffer: parse_or(lookup("OUTBOUND_BUFFER"), default_outbound_buffer),
                auto_join_rooms: parse_bool(lookup("AUTO_JOIN_ROOMS")),
                commands_per_second: parse_or(lookup("COMMANDS_PER_SECOND"), default_commands_per_second),
                command_burst: parse_or(lookup("COMMAND_BURST"), default_command_burst),
            },
            notifications: NotificationConfig {
                max_in_flight: parse_or(lookup("NOTIFY_MAX_IN_FLIGHT"), default_max_in_flight),
                webhook_url: lookup("NOTIFY_WEBHOOK_URL").filter(|s| !s.trim().is_empty()),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
