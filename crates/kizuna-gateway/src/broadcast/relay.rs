//! Message relay
//!
//! Every mutation is persisted before anything is fanned out, and fan-out is
//! enqueued synchronously before the call returns. Since each connection
//! runs its commands one at a time, two messages from the same connection
//! reach every subscriber in the order they were sent.

use crate::connection::{Connection, ConnectionManager};
use crate::events::{GatewayEventType, MessageDeleteEvent, MessagePayload, MessageReadEvent};
use kizuna_core::{Message, ReadReceipt, Snowflake};
use kizuna_service::{
    EditMessageRequest, MessageService, NotificationService, SendMessageRequest, SentMessage,
    ServiceContext, ServiceError, ServiceResult,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct MessageRelay {
    manager: Arc<ConnectionManager>,
    ctx: ServiceContext,
}

impl MessageRelay {
    pub fn new(ctx: ServiceContext, manager: Arc<ConnectionManager>) -> Self {
        Self { manager, ctx }
    }

    /// Persist a new message and deliver it to the room.
    ///
    /// Room members with no subscribed connection are handed to the
    /// notification dispatcher afterwards.
    #[instrument(skip_all, fields(session_id = %connection.session_id(), room_id = %request.room_id))]
    pub async fn send(
        &self,
        connection: &Connection,
        request: SendMessageRequest,
    ) -> ServiceResult<Message> {
        require_joined(connection, request.room_id)?;

        let nonce = request.nonce.clone();
        let SentMessage { message, room } = MessageService::new(&self.ctx)
            .send(connection.user_id(), request)
            .await?;

        let author = connection.identity().profile().clone();
        let payload = MessagePayload::new(&message, &author, nonce);
        let reached: HashSet<Snowflake> = self
            .manager
            .dispatch_to_room(message.room_id, GatewayEventType::MessageCreate, &payload, |_| true)
            .iter()
            .map(|conn| conn.user_id())
            .collect();

        debug!(message_id = %message.id, reached = reached.len(), "Message fanned out");

        NotificationService::new(&self.ctx).notify_unreached(author, room, message.clone(), reached);
        Ok(message)
    }

    /// Replace the body of the caller's own message
    #[instrument(skip_all, fields(session_id = %connection.session_id(), message_id = %request.message_id))]
    pub async fn edit(
        &self,
        connection: &Connection,
        request: EditMessageRequest,
    ) -> ServiceResult<Message> {
        let service = MessageService::new(&self.ctx);
        let message = self.find_visible(&service, connection, request.message_id).await?;

        let nonce = request.nonce.clone();
        let updated = service.edit(connection.user_id(), message, request).await?;

        let payload = MessagePayload::new(&updated, connection.identity().profile(), nonce);
        self.manager
            .dispatch_to_room(updated.room_id, GatewayEventType::MessageUpdate, &payload, |_| true);
        Ok(updated)
    }

    /// Soft-delete a message the caller wrote or moderates
    #[instrument(skip_all, fields(session_id = %connection.session_id(), message_id = %message_id))]
    pub async fn delete(
        &self,
        connection: &Connection,
        message_id: Snowflake,
        nonce: Option<String>,
    ) -> ServiceResult<Message> {
        let service = MessageService::new(&self.ctx);
        let message = self.find_visible(&service, connection, message_id).await?;

        let deleted = service.delete(connection.user_id(), message).await?;

        let event = MessageDeleteEvent {
            id: deleted.id,
            room_id: deleted.room_id,
            nonce,
        };
        self.manager
            .dispatch_to_room(deleted.room_id, GatewayEventType::MessageDelete, &event, |_| true);
        Ok(deleted)
    }

    /// Append a read receipt and tell the room's other subscribers
    #[instrument(skip_all, fields(session_id = %connection.session_id(), message_id = %message_id))]
    pub async fn read(
        &self,
        connection: &Connection,
        message_id: Snowflake,
    ) -> ServiceResult<ReadReceipt> {
        let service = MessageService::new(&self.ctx);
        let message = self.find_visible(&service, connection, message_id).await?;

        let receipt = service.mark_read(connection.user_id(), &message).await?;

        let event = MessageReadEvent::from(&receipt);
        let reader_session = connection.session_id();
        self.manager.dispatch_to_room(
            receipt.room_id,
            GatewayEventType::MessageRead,
            &event,
            |conn| conn.session_id() != reader_session,
        );
        Ok(receipt)
    }

    /// Load a live message from a room the connection has joined.
    ///
    /// An unknown id is `Forbidden`, the same as a message in a room the
    /// connection cannot see. `NotFound` is only reported for deleted
    /// messages in a joined room.
    async fn find_visible(
        &self,
        service: &MessageService<'_>,
        connection: &Connection,
        message_id: Snowflake,
    ) -> ServiceResult<Message> {
        let Some(message) = service.find(message_id).await? else {
            debug!(session_id = %connection.session_id(), message_id = %message_id, "Unknown message");
            return Err(ServiceError::Forbidden);
        };
        require_joined(connection, message.room_id)?;
        if message.deleted {
            return Err(ServiceError::not_found("Message", message_id.to_string()));
        }
        Ok(message)
    }
}

/// Commands only apply to rooms the connection has joined
pub(crate) fn require_joined(connection: &Connection, room_id: Snowflake) -> ServiceResult<()> {
    if connection.is_in_room(room_id) {
        Ok(())
    } else {
        debug!(
            session_id = %connection.session_id(),
            room_id = %room_id,
            "Command for a room the connection has not joined"
        );
        Err(ServiceError::Forbidden)
    }
}
