//! # kizuna-service
//!
//! Application layer between the gateway and the stores: credential
//! checks, room access, message persistence, presence writes and the
//! bounded pool that runs best-effort side work.

pub mod dto;
pub mod services;

pub use dto::{EditMessageRequest, SendMessageRequest};
pub use services::{
    AccessService, AuthService, AuthenticatedUser, LogDispatcher, MessageService,
    NotificationService, PresenceService, RoomAccess, SentMessage, ServiceContext,
    ServiceContextBuilder, ServiceError, ServiceResult, TaskPool, WebhookDispatcher,
};
