//! Event broadcasting
//!
//! The realtime components that turn commands into fan-out: presence, room
//! subscriptions, messages and typing indicators.

mod presence;
mod relay;
mod rooms;
mod typing;

pub use presence::PresenceTracker;
pub use relay::MessageRelay;
pub use rooms::RoomRegistry;
pub use typing::TypingCoordinator;
