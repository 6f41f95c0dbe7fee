//! Op code handlers
//!
//! Each connection feeds its frames through [`MessageDispatcher`] one at a
//! time. A returned [`HandlerError`] closes the connection with the mapped
//! close code; everything else is answered in-band or dropped.

mod disconnect;
mod error;
mod heartbeat;
mod identify;
mod message;
mod rooms;
mod typing;

pub use disconnect::DisconnectHandler;
pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use identify::{IdentifyHandler, PendingSession};
pub use message::MessageHandler;
pub use rooms::RoomHandler;
pub use typing::TypingHandler;

use crate::connection::Connection;
use crate::events::{GatewayEventType, MessageErrorEvent};
use crate::protocol::{GatewayMessage, OpCode};
use crate::server::GatewayState;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle a frame on a socket that has not identified yet.
    ///
    /// Returns the pending session once `Identify` is accepted. Heartbeats
    /// are answered; any other op closes the socket.
    pub async fn dispatch_unauthenticated(
        state: &GatewayState,
        message: GatewayMessage,
        sender: &mpsc::Sender<GatewayMessage>,
    ) -> HandlerResult<Option<PendingSession>> {
        match message.op {
            OpCode::Identify => {
                let payload = decode(&message)?;
                IdentifyHandler::handle(state, payload, sender.clone())
                    .await
                    .map(Some)
            }
            OpCode::Heartbeat => {
                // Best effort: the writer may already be gone
                let _ = sender.try_send(GatewayMessage::heartbeat_ack());
                Ok(None)
            }
            op if op.is_server_op() => Err(HandlerError::UnexpectedOp(op.to_string())),
            _ => Err(HandlerError::NotAuthenticated),
        }
    }

    /// Handle a frame from an authenticated connection
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Connection,
        message: GatewayMessage,
    ) -> HandlerResult<()> {
        let op = message.op;

        if op.is_server_op() {
            tracing::warn!(
                session_id = %connection.session_id(),
                op = %op,
                "Received server-only op code from client"
            );
            return Err(HandlerError::UnexpectedOp(op.to_string()));
        }

        if op.is_rate_limited() && !connection.check_rate() {
            Self::reject_rate_limited(connection, &message);
            return Ok(());
        }

        match op {
            OpCode::Heartbeat => HeartbeatHandler::handle(connection)?,
            OpCode::Identify => return Err(HandlerError::AlreadyAuthenticated),
            OpCode::RoomJoin => RoomHandler::join(state, connection, decode(&message)?).await,
            OpCode::RoomLeave => RoomHandler::leave(state, connection, decode(&message)?),
            OpCode::MessageSend => {
                MessageHandler::send(state, connection, decode(&message)?).await;
            }
            OpCode::MessageEdit => {
                MessageHandler::edit(state, connection, decode(&message)?).await;
            }
            OpCode::MessageDelete => {
                MessageHandler::delete(state, connection, decode(&message)?).await;
            }
            OpCode::MessageRead => {
                MessageHandler::read(state, connection, decode(&message)?).await;
            }
            OpCode::TypingStart => TypingHandler::start(state, connection, decode(&message)?).await,
            OpCode::TypingStop => TypingHandler::stop(state, connection, decode(&message)?).await,
            OpCode::Dispatch | OpCode::Hello | OpCode::HeartbeatAck => {
                return Err(HandlerError::UnexpectedOp(op.to_string()));
            }
        }
        Ok(())
    }

    /// Message commands get a `RATE_LIMITED` error; typing is dropped
    fn reject_rate_limited(connection: &Connection, message: &GatewayMessage) {
        tracing::debug!(
            session_id = %connection.session_id(),
            op = %message.op,
            "Command rate limited"
        );

        if matches!(message.op, OpCode::TypingStart | OpCode::TypingStop) {
            return;
        }

        let nonce = message
            .d
            .as_ref()
            .and_then(|d| d.get("nonce"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        connection.dispatch(
            GatewayEventType::MessageError,
            &MessageErrorEvent::rate_limited(nonce),
        );
    }
}

fn decode<T: DeserializeOwned>(message: &GatewayMessage) -> HandlerResult<T> {
    message
        .payload()
        .map_err(|e| HandlerError::InvalidPayload(format!("{}: {e}", message.op.name())))
}
