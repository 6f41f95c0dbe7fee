//! Connection management
//!
//! Live connections, their identities and the shared session/user/room index.

mod connection;
mod manager;
mod session;

pub use connection::{command_quota, Connection};
pub use manager::ConnectionManager;
pub use session::{new_session_id, Identity};
