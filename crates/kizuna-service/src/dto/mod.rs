//! Data transfer objects for realtime commands
//!
//! Request DTOs implement `Deserialize` and `Validate`; the gateway decodes
//! command payloads straight into them.

pub mod requests;

pub use requests::{validation_reason, EditMessageRequest, SendMessageRequest};
