//! Connection teardown

use crate::connection::Connection;
use crate::server::GatewayState;

pub struct DisconnectHandler;

impl DisconnectHandler {
    /// Drop the connection from every index and release its presence hold.
    /// Safe to call more than once.
    pub async fn handle(state: &GatewayState, connection: &Connection) {
        let session_id = connection.session_id();
        if state.connection_manager().unregister(session_id).is_none() {
            return;
        }

        state.presence().on_disconnect(connection.user_id()).await;

        tracing::info!(
            session_id = %session_id,
            user_id = %connection.user_id(),
            age_secs = connection.age().as_secs(),
            "Connection closed"
        );
    }
}
