//! Domain entities - core business objects

mod message;
mod presence;
mod room;
mod user;

pub use message::{
    truncate_preview, Attachment, Message, ReadReceipt, MAX_ATTACHMENTS, MAX_CONTENT_LENGTH,
};
pub use presence::PresenceRecord;
pub use room::{MemberRole, Room, RoomKind};
pub use user::UserProfile;
