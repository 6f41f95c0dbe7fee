//! Ports implemented by infrastructure crates

mod notification;
mod repositories;

pub use notification::{Notification, NotificationDispatcher};
pub use repositories::{
    MessageQuery, MessageRepository, PresenceRepository, RepoResult, RoomRepository,
    UserRepository,
};
