//! Connection manager
//!
//! The shared index of live connections: by session, by user and by room.
//! Every lookup clones the `Arc`s out before returning so no map guard is
//! ever held while frames are being enqueued.

use super::Connection;
use crate::events::GatewayEventType;
use dashmap::DashMap;
use kizuna_core::Snowflake;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

pub struct ConnectionManager {
    /// Active connections by session ID
    connections: DashMap<String, Arc<Connection>>,

    /// User ID to session IDs mapping
    user_connections: DashMap<Snowflake, HashSet<String>>,

    /// Room ID to subscribed session IDs mapping
    room_connections: DashMap<Snowflake, HashSet<String>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_connections: DashMap::new(),
            room_connections: DashMap::new(),
        }
    }

    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register an authenticated connection
    pub fn register(&self, connection: Arc<Connection>) {
        let session_id = connection.session_id().to_string();
        let user_id = connection.user_id();

        self.user_connections
            .entry(user_id)
            .or_default()
            .insert(session_id.clone());
        self.connections.insert(session_id.clone(), connection);

        tracing::debug!(session_id = %session_id, user_id = %user_id, "Connection registered");
    }

    /// Remove a connection from every index, including all rooms it joined
    pub fn unregister(&self, session_id: &str) -> Option<Arc<Connection>> {
        let (_, connection) = self.connections.remove(session_id)?;

        let user_id = connection.user_id();
        if let Some(mut sessions) = self.user_connections.get_mut(&user_id) {
            sessions.remove(session_id);
        }
        self.user_connections
            .remove_if(&user_id, |_, sessions| sessions.is_empty());

        for room_id in connection.rooms() {
            connection.remove_room(room_id);
            self.remove_from_room(room_id, session_id);
        }

        tracing::debug!(session_id = %session_id, user_id = %user_id, "Connection unregistered");
        Some(connection)
    }

    /// Add the connection to a room's subscribers. Returns `false` if it
    /// was already subscribed.
    pub fn subscribe(&self, connection: &Connection, room_id: Snowflake) -> bool {
        let added = connection.add_room(room_id);
        self.room_connections
            .entry(room_id)
            .or_default()
            .insert(connection.session_id().to_string());

        tracing::trace!(
            session_id = %connection.session_id(),
            room_id = %room_id,
            "Connection subscribed to room"
        );
        added
    }

    /// Remove the connection from a room's subscribers. Returns `false` if
    /// it was not subscribed.
    pub fn unsubscribe(&self, connection: &Connection, room_id: Snowflake) -> bool {
        let removed = connection.remove_room(room_id);
        self.remove_from_room(room_id, connection.session_id());

        tracing::trace!(
            session_id = %connection.session_id(),
            room_id = %room_id,
            removed,
            "Connection unsubscribed from room"
        );
        removed
    }

    fn remove_from_room(&self, room_id: Snowflake, session_id: &str) {
        if let Some(mut sessions) = self.room_connections.get_mut(&room_id) {
            sessions.remove(session_id);
        }
        self.room_connections
            .remove_if(&room_id, |_, sessions| sessions.is_empty());
    }

    pub fn get_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(session_id).map(|r| r.clone())
    }

    /// All connections belonging to a user
    pub fn user_connections(&self, user_id: Snowflake) -> Vec<Arc<Connection>> {
        let sessions: Vec<String> = self
            .user_connections
            .get(&user_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        self.resolve(sessions)
    }

    /// All connections subscribed to a room
    pub fn room_subscribers(&self, room_id: Snowflake) -> Vec<Arc<Connection>> {
        let sessions: Vec<String> = self
            .room_connections
            .get(&room_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        self.resolve(sessions)
    }

    pub fn all_connections(&self) -> Vec<Arc<Connection>> {
        self.connections.iter().map(|r| r.value().clone()).collect()
    }

    fn resolve(&self, sessions: Vec<String>) -> Vec<Arc<Connection>> {
        sessions
            .iter()
            .filter_map(|sid| self.connections.get(sid).map(|c| c.clone()))
            .collect()
    }

    /// Dispatch `data` to every subscriber of `room_id` for which `include`
    /// returns true. Returns the connections that accepted the frame.
    pub fn dispatch_to_room<T, F>(
        &self,
        room_id: Snowflake,
        event: GatewayEventType,
        data: &T,
        include: F,
    ) -> Vec<Arc<Connection>>
    where
        T: Serialize,
        F: Fn(&Connection) -> bool,
    {
        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(room_id = %room_id, event = %event, error = %e, "Failed to serialize event payload");
                return Vec::new();
            }
        };

        let reached: Vec<Arc<Connection>> = self
            .room_subscribers(room_id)
            .into_iter()
            .filter(|conn| include(conn))
            .filter(|conn| conn.dispatch_value(event, value.clone()))
            .collect();

        tracing::trace!(room_id = %room_id, event = %event, sent = reached.len(), "Room fan-out");
        reached
    }

    /// Dispatch `data` to every connection except those of `exclude_user`
    pub fn broadcast_except_user<T: Serialize>(
        &self,
        exclude_user: Snowflake,
        event: GatewayEventType,
        data: &T,
    ) -> usize {
        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(event = %event, error = %e, "Failed to serialize event payload");
                return 0;
            }
        };

        let sent = self
            .all_connections()
            .into_iter()
            .filter(|conn| conn.user_id() != exclude_user)
            .filter(|conn| conn.dispatch_value(event, value.clone()))
            .count();

        tracing::debug!(event = %event, sent, "Broadcast to all connections");
        sent
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of distinct users with at least one connection
    pub fn user_count(&self) -> usize {
        self.user_connections.len()
    }

    /// Number of rooms with at least one subscriber
    pub fn room_count(&self) -> usize {
        self.room_connections.len()
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.connections.contains_key(session_id)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("users", &self.user_connections.len())
            .field("rooms", &self.room_connections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{command_quota, Identity};
    use crate::events::RoomEvent;
    use crate::protocol::GatewayMessage;
    use kizuna_common::RealtimeConfig;
    use kizuna_core::UserProfile;
    use tokio::sync::mpsc;

    const ROOM: Snowflake = Snowflake::new(100);

    fn connection(
        session_id: &str,
        user_id: i64,
    ) -> (Arc<Connection>, mpsc::Receiver<GatewayMessage>) {
        let (tx, rx) = mpsc::channel(16);
        let identity = Identity::new(UserProfile::new(Snowflake::new(user_id), "user"));
        let conn = Connection::new(
            session_id.to_string(),
            identity,
            tx,
            command_quota(&RealtimeConfig::default()),
        );
        (conn, rx)
    }

    #[test]
    fn test_manager_creation() {
        let manager = ConnectionManager::new();
        assert_eq!(manager.connection_count(), 0);
        assert_eq!(manager.user_count(), 0);
        assert_eq!(manager.room_count(), 0);
    }

    #[test]
    fn test_register_and_unregister() {
        let manager = ConnectionManager::new();
        let (conn, _rx) = connection("s1", 1);

        manager.register(conn);
        assert!(manager.has_session("s1"));
        assert_eq!(manager.user_count(), 1);

        assert!(manager.unregister("s1").is_some());
        assert!(manager.unregister("s1").is_none());
        assert_eq!(manager.connection_count(), 0);
        assert_eq!(manager.user_count(), 0);
    }

    #[test]
    fn test_multiple_user_connections() {
        let manager = ConnectionManager::new();
        let (a, _ra) = connection("s1", 1);
        let (b, _rb) = connection("s2", 1);
        manager.register(a);
        manager.register(b);

        assert_eq!(manager.user_connections(Snowflake::new(1)).len(), 2);
        assert_eq!(manager.user_count(), 1);

        manager.unregister("s1");
        assert_eq!(manager.user_connections(Snowflake::new(1)).len(), 1);
        assert_eq!(manager.user_count(), 1);
    }

    #[test]
    fn test_room_subscriptions_follow_connection() {
        let manager = ConnectionManager::new();
        let (conn, _rx) = connection("s1", 1);
        manager.register(conn.clone());

        assert!(manager.subscribe(&conn, ROOM));
        assert!(!manager.subscribe(&conn, ROOM));
        assert_eq!(manager.room_subscribers(ROOM).len(), 1);

        assert!(manager.unsubscribe(&conn, ROOM));
        assert!(!manager.unsubscribe(&conn, ROOM));
        assert!(manager.room_subscribers(ROOM).is_empty());
        assert_eq!(manager.room_count(), 0);
    }

    #[test]
    fn test_unregister_leaves_every_room() {
        let manager = ConnectionManager::new();
        let (conn, _rx) = connection("s1", 1);
        manager.register(conn.clone());
        manager.subscribe(&conn, ROOM);
        manager.subscribe(&conn, Snowflake::new(101));

        manager.unregister("s1");
        assert_eq!(manager.room_count(), 0);
        assert!(conn.rooms().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_to_room_with_filter() {
        let manager = ConnectionManager::new();
        let (a, mut ra) = connection("s1", 1);
        let (b, mut rb) = connection("s2", 2);
        for conn in [&a, &b] {
            manager.register(conn.clone());
            manager.subscribe(conn, ROOM);
        }

        let reached = manager.dispatch_to_room(
            ROOM,
            GatewayEventType::RoomJoined,
            &RoomEvent { room_id: ROOM },
            |conn| conn.user_id() != Snowflake::new(1),
        );

        assert_eq!(reached.len(), 1);
        assert_eq!(reached[0].session_id(), "s2");
        assert!(rb.try_recv().is_ok());
        assert!(ra.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_except_user() {
        let manager = ConnectionManager::new();
        let (a, mut ra) = connection("s1", 1);
        let (b, mut rb) = connection("s2", 2);
        let (c, mut rc) = connection("s3", 2);
        manager.register(a);
        manager.register(b);
        manager.register(c);

        let sent = manager.broadcast_except_user(
            Snowflake::new(2),
            GatewayEventType::PresenceUpdate,
            &serde_json::json!({}),
        );

        assert_eq!(sent, 1);
        assert!(ra.try_recv().is_ok());
        assert!(rb.try_recv().is_err());
        assert!(rc.try_recv().is_err());
    }
}
