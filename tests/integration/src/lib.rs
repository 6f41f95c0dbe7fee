//! Integration test utilities for the realtime gateway
//!
//! Spawns the gateway on an ephemeral port over a seeded in-memory store and
//! drives it with real WebSocket clients.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
