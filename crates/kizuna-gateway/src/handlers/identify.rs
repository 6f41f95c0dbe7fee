//! Identify handler (op 2)

use super::{HandlerError, HandlerResult};
use crate::connection::{command_quota, new_session_id, Connection, Identity};
use crate::events::{GatewayEventType, ReadyEvent, UserPayload, GATEWAY_VERSION};
use crate::protocol::{GatewayMessage, IdentifyPayload};
use crate::server::GatewayState;
use kizuna_service::{AuthService, AuthenticatedUser};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct IdentifyHandler;

/// A socket whose credential has been accepted but which is not live yet.
///
/// Nothing is registered or announced until [`IdentifyHandler::activate`]
/// runs, so dropping it needs no cleanup.
#[derive(Debug)]
pub struct PendingSession {
    connection: Arc<Connection>,
    user: AuthenticatedUser,
}

impl IdentifyHandler {
    /// Resolve the credential and build the connection
    pub async fn handle(
        state: &GatewayState,
        payload: IdentifyPayload,
        sender: mpsc::Sender<GatewayMessage>,
    ) -> HandlerResult<PendingSession> {
        let user = AuthService::new(state.service_context())
            .authenticate(&payload.token)
            .await
            .map_err(|e| {
                tracing::debug!(reason = e.code(), "Identify rejected");
                HandlerError::from(e)
            })?;

        let connection = Connection::new(
            new_session_id(),
            Identity::from(&user),
            sender,
            command_quota(state.realtime()),
        );

        Ok(PendingSession { connection, user })
    }

    /// Bring an authenticated connection online.
    ///
    /// `READY` is its first dispatch. The connection is then registered,
    /// presence is updated and, when configured, every room in the seed
    /// list is joined. Once this returns `Ok` the caller owns disconnect
    /// cleanup.
    pub async fn activate(
        state: &GatewayState,
        pending: PendingSession,
    ) -> HandlerResult<Arc<Connection>> {
        let PendingSession { connection, user } = pending;
        let session_id = connection.session_id().to_string();

        let ready = ReadyEvent {
            v: GATEWAY_VERSION,
            session_id: session_id.clone(),
            user: UserPayload::from(&user.profile),
            rooms: user.rooms.clone(),
        };
        if !connection.dispatch(GatewayEventType::Ready, &ready) {
            return Err(HandlerError::Internal("Failed to send READY".to_string()));
        }

        state.connection_manager().register(connection.clone());
        state.presence().on_connect(user.user_id()).await;

        if state.realtime().auto_join_rooms {
            let joined = state.rooms().join_all(&connection, &user.rooms).await;
            tracing::debug!(session_id = %session_id, joined, "Auto-joined rooms");
        }

        tracing::info!(
            session_id = %session_id,
            user_id = %user.user_id(),
            username = %user.profile.username,
            rooms = user.rooms.len(),
            "Client identified"
        );

        Ok(connection)
    }
}
