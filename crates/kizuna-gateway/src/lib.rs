//! # kizuna-gateway
//!
//! WebSocket gateway for the realtime broker: session authentication,
//! presence, room subscriptions, message fan-out and typing indicators.
//!
//! ```rust,ignore
//! let config = kizuna_common::AppConfig::from_env()?;
//! kizuna_gateway::run(config).await?;
//! ```

pub mod broadcast;
pub mod connection;
pub mod events;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{create_app, create_gateway_state, run, GatewayState};
