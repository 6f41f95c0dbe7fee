//! Database models - SQLx-compatible structs for PostgreSQL tables

mod message;
mod room;
mod user;

pub use message::MessageModel;
pub use room::RoomModel;
pub use user::{PresenceModel, UserModel};
