//! Kizuna Gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p kizuna-gateway
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use anyhow::Context;
use kizuna_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "Gateway failed to start");
        eprintln!("kizuna-gateway: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        address = %config.gateway.address(),
        store = ?config.store.backend,
        "Configuration loaded"
    );

    kizuna_gateway::run(config)
        .await
        .context("gateway server stopped")?;

    Ok(())
}
