//! Gateway state
//!
//! The explicit registry every socket task shares: services, the connection
//! index and the realtime components built on top of it.

use crate::broadcast::{MessageRelay, PresenceTracker, RoomRegistry, TypingCoordinator};
use crate::connection::ConnectionManager;
use kizuna_common::RealtimeConfig;
use kizuna_service::ServiceContext;
use std::sync::Arc;

#[derive(Clone)]
pub struct GatewayState {
    service_context: Arc<ServiceContext>,
    connection_manager: Arc<ConnectionManager>,
    presence: Arc<PresenceTracker>,
    rooms: Arc<RoomRegistry>,
    relay: Arc<MessageRelay>,
    typing: Arc<TypingCoordinator>,
    realtime: Arc<RealtimeConfig>,
}

impl GatewayState {
    pub fn new(service_context: ServiceContext, realtime: RealtimeConfig) -> Self {
        let manager = ConnectionManager::new_shared();

        Self {
            presence: Arc::new(PresenceTracker::new(service_context.clone(), manager.clone())),
            rooms: Arc::new(RoomRegistry::new(service_context.clone(), manager.clone())),
            relay: Arc::new(MessageRelay::new(service_context.clone(), manager.clone())),
            typing: Arc::new(TypingCoordinator::new(service_context.clone(), manager.clone())),
            service_context: Arc::new(service_context),
            connection_manager: manager,
            realtime: Arc::new(realtime),
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn connection_manager(&self) -> &Arc<ConnectionManager> {
        &self.connection_manager
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn relay(&self) -> &MessageRelay {
        &self.relay
    }

    pub fn typing(&self) -> &TypingCoordinator {
        &self.typing
    }

    pub fn realtime(&self) -> &RealtimeConfig {
        &self.realtime
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connection_manager", &self.connection_manager)
            .field("presence", &self.presence)
            .field("realtime", &self.realtime)
            .finish_non_exhaustive()
    }
}
