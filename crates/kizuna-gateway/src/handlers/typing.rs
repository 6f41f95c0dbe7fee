//! Typing handlers (ops 6, 7)

use crate::connection::Connection;
use crate::protocol::RoomPayload;
use crate::server::GatewayState;

pub struct TypingHandler;

impl TypingHandler {
    pub async fn start(state: &GatewayState, connection: &Connection, payload: RoomPayload) {
        state.typing().start_typing(connection, payload.room_id).await;
    }

    pub async fn stop(state: &GatewayState, connection: &Connection, payload: RoomPayload) {
        state.typing().stop_typing(connection, payload.room_id).await;
    }
}
