//! Heartbeat handler (op 1)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::GatewayMessage;

pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// Record the heartbeat and answer with op 11
    pub fn handle(connection: &Connection) -> HandlerResult<()> {
        connection.record_heartbeat();

        tracing::trace!(
            session_id = %connection.session_id(),
            server_seq = connection.current_sequence(),
            "Heartbeat received"
        );

        if !connection.send(GatewayMessage::heartbeat_ack()) {
            tracing::warn!(session_id = %connection.session_id(), "Failed to send heartbeat ACK");
            return Err(HandlerError::Internal("Failed to send heartbeat ACK".to_string()));
        }
        Ok(())
    }
}
