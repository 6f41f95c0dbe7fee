//! Message handlers (ops 5, 8, 9, 12)
//!
//! Rejections are answered with `MESSAGE_ERROR` on the issuing connection
//! only; the connection stays open.

use crate::connection::Connection;
use crate::events::{GatewayEventType, MessageErrorEvent};
use crate::protocol::MessageRefPayload;
use crate::server::GatewayState;
use kizuna_service::{EditMessageRequest, SendMessageRequest, ServiceError};

pub struct MessageHandler;

impl MessageHandler {
    pub async fn send(state: &GatewayState, connection: &Connection, request: SendMessageRequest) {
        let nonce = request.nonce.clone();
        if let Err(e) = state.relay().send(connection, request).await {
            Self::report(connection, &e, nonce);
        }
    }

    pub async fn edit(state: &GatewayState, connection: &Connection, request: EditMessageRequest) {
        let nonce = request.nonce.clone();
        if let Err(e) = state.relay().edit(connection, request).await {
            Self::report(connection, &e, nonce);
        }
    }

    pub async fn delete(state: &GatewayState, connection: &Connection, payload: MessageRefPayload) {
        let MessageRefPayload { message_id, nonce } = payload;
        if let Err(e) = state
            .relay()
            .delete(connection, message_id, nonce.clone())
            .await
        {
            Self::report(connection, &e, nonce);
        }
    }

    pub async fn read(state: &GatewayState, connection: &Connection, payload: MessageRefPayload) {
        if let Err(e) = state.relay().read(connection, payload.message_id).await {
            Self::report(connection, &e, payload.nonce);
        }
    }

    /// Send `MESSAGE_ERROR` to the connection that issued the command
    pub fn report(connection: &Connection, error: &ServiceError, nonce: Option<String>) {
        match error {
            ServiceError::Internal(_) | ServiceError::PersistenceFailure(_) => tracing::warn!(
                session_id = %connection.session_id(),
                error = %error,
                "Message command failed"
            ),
            _ => tracing::debug!(
                session_id = %connection.session_id(),
                reason = error.code(),
                "Message command rejected"
            ),
        }

        connection.dispatch(
            GatewayEventType::MessageError,
            &MessageErrorEvent::from_error(error, nonce),
        );
    }
}
