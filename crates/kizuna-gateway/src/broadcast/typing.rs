//! Typing indicators
//!
//! Nothing is stored. Indicators go to the room's subscribers minus every
//! connection of the typist, and unauthorized attempts are dropped silently.

use super::relay::require_joined;
use crate::connection::{Connection, ConnectionManager};
use crate::events::{GatewayEventType, TypingEvent};
use chrono::Utc;
use kizuna_core::Snowflake;
use kizuna_service::{AccessService, ServiceContext};
use std::sync::Arc;
use tracing::debug;

pub struct TypingCoordinator {
    manager: Arc<ConnectionManager>,
    ctx: ServiceContext,
}

impl TypingCoordinator {
    pub fn new(ctx: ServiceContext, manager: Arc<ConnectionManager>) -> Self {
        Self { manager, ctx }
    }

    pub async fn start_typing(&self, connection: &Connection, room_id: Snowflake) -> bool {
        self.relay(connection, room_id, GatewayEventType::TypingStart).await
    }

    pub async fn stop_typing(&self, connection: &Connection, room_id: Snowflake) -> bool {
        self.relay(connection, room_id, GatewayEventType::TypingStop).await
    }

    async fn relay(&self, connection: &Connection, room_id: Snowflake, event: GatewayEventType) -> bool {
        let user_id = connection.user_id();

        if require_joined(connection, room_id).is_err() {
            return false;
        }
        if let Err(e) = AccessService::new(&self.ctx).require_chat(room_id, user_id).await {
            debug!(user_id = %user_id, room_id = %room_id, reason = e.code(), "Typing indicator dropped");
            return false;
        }

        let payload = TypingEvent {
            room_id,
            user_id,
            timestamp: Utc::now(),
        };
        self.manager
            .dispatch_to_room(room_id, event, &payload, |conn| conn.user_id() != user_id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::RoomRegistry;
    use crate::connection::{command_quota, Identity};
    use crate::protocol::GatewayMessage;
    use kizuna_common::{JwtService, RealtimeConfig};
    use kizuna_core::{MemberRole, Room, RoomFlags, UserProfile};
    use kizuna_db::MemoryStore;
    use kizuna_service::ServiceContextBuilder;
    use tokio::sync::mpsc;

    const SERVER: Snowflake = Snowflake::new(10);
    const ROOM: Snowflake = Snowflake::new(100);
    const ALICE: Snowflake = Snowflake::new(1);
    const BOB: Snowflake = Snowflake::new(2);

    async fn setup() -> (
        Arc<MemoryStore>,
        TypingCoordinator,
        Vec<(Arc<Connection>, mpsc::Receiver<GatewayMessage>)>,
    ) {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(UserProfile::new(ALICE, "alice"));
        store.insert_user(UserProfile::new(BOB, "bob"));
        store.insert_room(Room::new_channel(ROOM, SERVER, "general"));
        store.add_server_member(SERVER, ALICE, MemberRole::Member);
        store.add_server_member(SERVER, BOB, MemberRole::Member);

        let ctx = ServiceContextBuilder::new()
            .user_repo(store.clone())
            .room_repo(store.clone())
            .message_repo(store.clone())
            .presence_repo(store.clone())
            .jwt_service(Arc::new(JwtService::new("secret", 60)))
            .build()
            .unwrap();
        let manager = ConnectionManager::new_shared();
        let registry = RoomRegistry::new(ctx.clone(), manager.clone());

        let mut connections = Vec::new();
        // alice on two devices, bob on one
        for (session, user) in [("a1", ALICE), ("a2", ALICE), ("b1", BOB)] {
            let (tx, mut rx) = mpsc::channel(16);
            let conn = Connection::new(
                session.into(),
                Identity::new(UserProfile::new(user, "user")),
                tx,
                command_quota(&RealtimeConfig::default()),
            );
            manager.register(conn.clone());
            registry.join(&conn, ROOM).await;
            rx.recv().await.unwrap();
            connections.push((conn, rx));
        }

        (store, TypingCoordinator::new(ctx, manager), connections)
    }

    #[tokio::test]
    async fn test_typing_excludes_all_of_senders_connections() {
        let (_store, typing, mut conns) = setup().await;

        assert!(typing.start_typing(&conns[0].0, ROOM).await);

        assert!(conns[0].1.try_recv().is_err());
        assert!(conns[1].1.try_recv().is_err());
        let frame = conns[2].1.try_recv().unwrap();
        assert_eq!(frame.t.as_deref(), Some("TYPING_START"));
        assert_eq!(frame.d.unwrap()["user_id"], "1");

        assert!(typing.stop_typing(&conns[0].0, ROOM).await);
        assert_eq!(
            conns[2].1.try_recv().unwrap().t.as_deref(),
            Some("TYPING_STOP")
        );
    }

    #[tokio::test]
    async fn test_typing_dropped_when_chat_disabled() {
        let (store, typing, mut conns) = setup().await;
        store.set_room_flags(ROOM, RoomFlags::empty());

        assert!(!typing.start_typing(&conns[0].0, ROOM).await);
        assert!(conns[2].1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_typing_in_unjoined_room_dropped() {
        let (_store, typing, mut conns) = setup().await;
        assert!(!typing.start_typing(&conns[0].0, Snowflake::new(999)).await);
        assert!(conns[2].1.try_recv().is_err());
    }
}
