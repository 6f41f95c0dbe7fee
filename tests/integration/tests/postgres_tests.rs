//! PostgreSQL-backed gateway tests
//!
//! These tests require a running PostgreSQL instance and `DATABASE_URL`.
//! They are skipped when it is unset.
//!
//! Run with: cargo test -p integration-tests --test postgres_tests

use std::collections::HashMap;

use kizuna_common::{AppConfig, StoreBackend};
use kizuna_gateway::create_gateway_state;

fn postgres_config() -> Option<AppConfig> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return None;
    };

    let vars: HashMap<&str, String> = HashMap::from([
        ("STORE_BACKEND", "postgres".to_string()),
        ("DATABASE_URL", url),
        ("GATEWAY_PORT", "0".to_string()),
        ("JWT_SECRET", "integration-secret".to_string()),
    ]);
    Some(AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("valid config"))
}

#[tokio::test]
async fn test_postgres_backend_starts_and_migrates() {
    let Some(config) = postgres_config() else {
        return;
    };
    assert_eq!(config.store.backend, StoreBackend::Postgres);

    let state = create_gateway_state(&config)
        .await
        .expect("gateway state over postgres");
    assert_eq!(state.connection_manager().connection_count(), 0);

    // Migrations are idempotent
    create_gateway_state(&config)
        .await
        .expect("second start over the same database");
}

#[test]
fn test_postgres_backend_requires_database_url() {
    let vars: HashMap<&str, String> = HashMap::from([
        ("STORE_BACKEND", "postgres".to_string()),
        ("GATEWAY_PORT", "8081".to_string()),
        ("JWT_SECRET", "secret".to_string()),
    ]);
    assert!(AppConfig::from_lookup(|key| vars.get(key).cloned()).is_err());
}
