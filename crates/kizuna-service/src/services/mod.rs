//! Application services
//!
//! Each service borrows a [`ServiceContext`] and owns one slice of the
//! realtime core: authentication, room access, messages, presence and
//! offline notifications.

pub mod access;
pub mod auth;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod notification;
pub mod presence;
pub mod task_pool;

pub use access::{AccessService, RoomAccess};
pub use auth::{AuthService, AuthenticatedUser};
pub use context::{ServiceContext, ServiceContextBuilder};
pub use dispatcher::{LogDispatcher, WebhookDispatcher};
pub use error::{ServiceError, ServiceResult};
pub use message::{MessageService, SentMessage};
pub use notification::{build_notification, preview_text, NotificationService, PREVIEW_CHARS};
pub use presence::PresenceService;
pub use task_pool::{TaskPool, DEFAULT_MAX_IN_FLIGHT};
