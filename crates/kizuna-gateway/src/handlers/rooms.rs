//! Room join/leave handlers (ops 3, 4)

use crate::connection::Connection;
use crate::protocol::RoomPayload;
use crate::server::GatewayState;

pub struct RoomHandler;

impl RoomHandler {
    pub async fn join(state: &GatewayState, connection: &Connection, payload: RoomPayload) {
        state.rooms().join(connection, payload.room_id).await;
    }

    pub fn leave(state: &GatewayState, connection: &Connection, payload: RoomPayload) {
        state.rooms().leave(connection, payload.room_id);
    }
}
