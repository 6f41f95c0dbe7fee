//! Gateway server setup
//!
//! Wires the configured stores into a [`GatewayState`] and serves the
//! WebSocket endpoint.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use axum::{extract::State, routing::get, Json, Router};
use kizuna_cache::{RedisPool, RedisPoolConfig, RedisPresenceRepository};
use kizuna_common::{AppConfig, AppError, JwtService, StoreBackend};
use kizuna_core::{
    MessageRepository, NotificationDispatcher, PresenceRepository, RoomRepository,
    SnowflakeGenerator, UserRepository,
};
use kizuna_db::{
    MemorySeed, MemoryStore, PgMessageRepository, PgPresenceRepository, PgRoomRepository,
    PgUserRepository,
};
use kizuna_service::{LogDispatcher, ServiceContextBuilder, TaskPool, WebhookDispatcher};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connections": state.connection_manager().connection_count(),
        "online_users": state.presence().online_count(),
    }))
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

struct Stores {
    users: Arc<dyn UserRepository>,
    rooms: Arc<dyn RoomRepository>,
    messages: Arc<dyn MessageRepository>,
    presence: Arc<dyn PresenceRepository>,
}

async fn postgres_stores(config: &AppConfig) -> Result<Stores, AppError> {
    let database = config
        .database
        .as_ref()
        .ok_or_else(|| AppError::Config("DATABASE_URL is required for the postgres store".into()))?;

    tracing::info!("Connecting to PostgreSQL...");
    let pool = kizuna_db::create_pool(&kizuna_db::DatabaseConfig::from(database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    kizuna_db::run_migrations(&pool)
        .await
        .map_err(|e| AppError::Database(format!("migration failed: {e}")))?;
    tracing::info!("PostgreSQL connection established");

    Ok(Stores {
        users: Arc::new(PgUserRepository::new(pool.clone())),
        rooms: Arc::new(PgRoomRepository::new(pool.clone())),
        messages: Arc::new(PgMessageRepository::new(pool.clone())),
        presence: Arc::new(PgPresenceRepository::new(pool)),
    })
}

fn memory_stores(config: &AppConfig) -> Result<Stores, AppError> {
    let store = Arc::new(MemoryStore::new());

    if let Some(path) = &config.store.seed_file {
        let seed = MemorySeed::from_file(path).map_err(|e| AppError::Config(e.to_string()))?;
        store
            .apply_seed(seed)
            .map_err(|e| AppError::Config(e.to_string()))?;
        tracing::info!(seed_file = %path, "Memory store seeded");
    } else {
        tracing::warn!("Memory store started without a seed; no user can authenticate");
    }

    Ok(Stores {
        users: store.clone(),
        rooms: store.clone(),
        messages: store.clone(),
        presence: store,
    })
}

/// Initialize all dependencies and create `GatewayState`
pub async fn create_gateway_state(config: &AppConfig) -> Result<GatewayState, AppError> {
    let mut stores = match config.store.backend {
        StoreBackend::Postgres => postgres_stores(config).await?,
        StoreBackend::Memory => memory_stores(config)?,
    };

    if let Some(redis) = &config.redis {
        tracing::info!("Connecting to Redis...");
        let pool = RedisPool::new(RedisPoolConfig::from(redis))
            .map_err(|e| AppError::Cache(e.to_string()))?;
        pool.ping()
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        stores.presence = Arc::new(RedisPresenceRepository::new(pool));
        tracing::info!("Presence records kept in Redis");
    }

    let notifier: Arc<dyn NotificationDispatcher> = match &config.notifications.webhook_url {
        Some(url) => {
            tracing::info!(url = %url, "Notifications delivered by webhook");
            Arc::new(WebhookDispatcher::new(url.as_str()).map_err(|e| AppError::Config(e.to_string()))?)
        }
        None => Arc::new(LogDispatcher),
    };

    let service_context = ServiceContextBuilder::new()
        .user_repo(stores.users)
        .room_repo(stores.rooms)
        .message_repo(stores.messages)
        .presence_repo(stores.presence)
        .notifier(notifier)
        .task_pool(TaskPool::new(
            "side_effects",
            config.notifications.max_in_flight,
        ))
        .jwt_service(Arc::new(JwtService::new(
            &config.jwt.secret,
            config.jwt.access_token_expiry,
        )))
        .snowflake_generator(Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id)))
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    Ok(GatewayState::new(service_context, config.realtime.clone()))
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let address = config.gateway.address();
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address {address}: {e}")))?;

    let state = create_gateway_state(&config).await?;
    let app = create_app(state);

    run_server(app, addr).await
}
