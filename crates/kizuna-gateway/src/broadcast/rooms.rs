//! Room registry
//!
//! Joining a room subscribes a connection to its live traffic. Membership is
//! checked against the store on every join.

use crate::connection::{Connection, ConnectionManager};
use crate::events::{GatewayEventType, RoomEvent};
use kizuna_core::Snowflake;
use kizuna_service::{AccessService, ServiceContext};
use std::sync::Arc;
use tracing::debug;

pub struct RoomRegistry {
    manager: Arc<ConnectionManager>,
    ctx: ServiceContext,
}

impl RoomRegistry {
    pub fn new(ctx: ServiceContext, manager: Arc<ConnectionManager>) -> Self {
        Self { manager, ctx }
    }

    /// Subscribe the connection to `room_id` if its user is a member.
    ///
    /// Non-members and unknown rooms are dropped without a reply. On success
    /// `ROOM_JOINED` is sent to this connection only.
    pub async fn join(&self, connection: &Connection, room_id: Snowflake) -> bool {
        let user_id = connection.user_id();

        if !AccessService::new(&self.ctx).can_join(room_id, user_id).await {
            debug!(
                session_id = %connection.session_id(),
                user_id = %user_id,
                room_id = %room_id,
                "Room join dropped"
            );
            return false;
        }

        self.manager.subscribe(connection, room_id);
        connection.dispatch(GatewayEventType::RoomJoined, &RoomEvent { room_id });

        debug!(session_id = %connection.session_id(), room_id = %room_id, "Joined room");
        true
    }

    /// Unsubscribe from `room_id`. Leaving a room that was not joined does nothing.
    pub fn leave(&self, connection: &Connection, room_id: Snowflake) -> bool {
        if !self.manager.unsubscribe(connection, room_id) {
            return false;
        }

        connection.dispatch(GatewayEventType::RoomLeft, &RoomEvent { room_id });
        debug!(session_id = %connection.session_id(), room_id = %room_id, "Left room");
        true
    }

    /// Join each of `rooms` in order, returning how many succeeded
    pub async fn join_all(&self, connection: &Connection, rooms: &[Snowflake]) -> usize {
        let mut joined = 0;
        for room_id in rooms {
            if self.join(connection, *room_id).await {
                joined += 1;
            }
        }
        joined
    }

    pub fn subscriber_count(&self, room_id: Snowflake) -> usize {
        self.manager.room_subscribers(room_id).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{command_quota, Identity};
    use crate::protocol::GatewayMessage;
    use kizuna_common::{JwtService, RealtimeConfig};
    use kizuna_core::{MemberRole, Room, UserProfile};
    use kizuna_db::MemoryStore;
    use kizuna_service::ServiceContextBuilder;
    use tokio::sync::mpsc;

    const SERVER: Snowflake = Snowflake::new(10);
    const ROOM: Snowflake = Snowflake::new(100);
    const ALICE: Snowflake = Snowflake::new(1);
    const EVE: Snowflake = Snowflake::new(3);

    fn setup() -> (Arc<MemoryStore>, Arc<ConnectionManager>, RoomRegistry) {
        let store = Arc::new(MemoryStore::new());
        store.insert_user(UserProfile::new(ALICE, "alice"));
        store.insert_user(UserProfile::new(EVE, "eve"));
        store.insert_room(Room::new_channel(ROOM, SERVER, "general"));
        store.add_server_member(SERVER, ALICE, MemberRole::Member);

        let ctx = ServiceContextBuilder::new()
            .user_repo(store.clone())
            .room_repo(store.clone())
            .message_repo(store.clone())
            .presence_repo(store.clone())
            .jwt_service(Arc::new(JwtService::new("secret", 60)))
            .build()
            .unwrap();
        let manager = ConnectionManager::new_shared();
        let registry = RoomRegistry::new(ctx, manager.clone());
        (store, manager, registry)
    }

    fn connect(
        manager: &ConnectionManager,
        user_id: Snowflake,
    ) -> (Arc<Connection>, mpsc::Receiver<GatewayMessage>) {
        let (tx, rx) = mpsc::channel(16);
        let conn = Connection::new(
            format!("session-{user_id}"),
            Identity::new(UserProfile::new(user_id, "user")),
            tx,
            command_quota(&RealtimeConfig::default()),
        );
        manager.register(conn.clone());
        (conn, rx)
    }

    #[tokio::test]
    async fn test_member_join_is_acknowledged() {
        let (_store, manager, registry) = setup();
        let (conn, mut rx) = connect(&manager, ALICE);

        assert!(registry.join(&conn, ROOM).await);
        assert!(conn.is_in_room(ROOM));
        assert_eq!(registry.subscriber_count(ROOM), 1);

        let ack = rx.recv().await.unwrap();
        assert_eq!(ack.t.as_deref(), Some("ROOM_JOINED"));
        assert_eq!(ack.d.unwrap()["room_id"], "100");
    }

    #[tokio::test]
    async fn test_non_member_join_is_silent() {
        let (_store, manager, registry) = setup();
        let (conn, mut rx) = connect(&manager, EVE);

        assert!(!registry.join(&conn, ROOM).await);
        assert!(!registry.join(&conn, Snowflake::new(999)).await);
        assert!(!conn.is_in_room(ROOM));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_leave_twice_is_noop() {
        let (_store, manager, registry) = setup();
        let (conn, mut rx) = connect(&manager, ALICE);
        registry.join(&conn, ROOM).await;
        rx.recv().await.unwrap();

        assert!(registry.leave(&conn, ROOM));
        assert_eq!(rx.recv().await.unwrap().t.as_deref(), Some("ROOM_LEFT"));

        assert!(!registry.leave(&conn, ROOM));
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.subscriber_count(ROOM), 0);
    }

    #[tokio::test]
    async fn test_removed_member_cannot_rejoin() {
        let (store, manager, registry) = setup();
        let (conn, _rx) = connect(&manager, ALICE);
        assert!(registry.join(&conn, ROOM).await);
        registry.leave(&conn, ROOM);

        store.remove_server_member(SERVER, ALICE);
        assert!(!registry.join(&conn, ROOM).await);
    }
}
