//! Individual WebSocket connection
//!
//! Outbound frames go through a bounded queue drained by the socket's writer
//! task. Dispatch never waits: a connection whose queue is full is asked to
//! close rather than stalling fan-out for everyone else in the room.

use super::Identity;
use crate::events::GatewayEventType;
use crate::protocol::{CloseCode, GatewayMessage};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use kizuna_common::RealtimeConfig;
use kizuna_core::Snowflake;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};

/// Per-connection command quota from the realtime settings
pub fn command_quota(config: &RealtimeConfig) -> Quota {
    let rate = NonZeroU32::new(config.commands_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(config.command_burst).unwrap_or(rate);
    Quota::per_second(rate).allow_burst(burst)
}

/// A single authenticated WebSocket connection
pub struct Connection {
    session_id: String,

    identity: Identity,

    /// Channel to the socket writer
    sender: mpsc::Sender<GatewayMessage>,

    /// Last dispatch sequence handed out. Held while enqueueing so queue
    /// order and sequence order agree.
    sequence: Mutex<u64>,

    last_heartbeat: Mutex<Instant>,

    /// Rooms this connection receives fan-out for
    rooms: RwLock<HashSet<Snowflake>>,

    limiter: DefaultDirectRateLimiter,

    /// First close reason requested by the server side
    close_reason: OnceLock<CloseCode>,
    close_signal: Notify,

    created_at: Instant,
}

impl Connection {
    pub fn new(
        session_id: String,
        identity: Identity,
        sender: mpsc::Sender<GatewayMessage>,
        quota: Quota,
    ) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            identity,
            sender,
            sequence: Mutex::new(0),
            last_heartbeat: Mutex::new(Instant::now()),
            rooms: RwLock::new(HashSet::new()),
            limiter: RateLimiter::direct(quota),
            close_reason: OnceLock::new(),
            close_signal: Notify::new(),
            created_at: Instant::now(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_id(&self) -> Snowflake {
        self.identity.user_id()
    }

    /// Sequence number of the last dispatch enqueued
    pub fn current_sequence(&self) -> u64 {
        *self.sequence.lock()
    }

    // === Outbound ===

    /// Serialize `data` and enqueue it as a dispatch event
    pub fn dispatch<T: Serialize>(&self, event: GatewayEventType, data: &T) -> bool {
        match serde_json::to_value(data) {
            Ok(value) => self.dispatch_value(event, value),
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    event = %event,
                    error = %e,
                    "Failed to serialize event payload"
                );
                false
            }
        }
    }

    /// Enqueue an already serialized dispatch event
    pub fn dispatch_value(&self, event: GatewayEventType, data: Value) -> bool {
        let mut sequence = self.sequence.lock();
        let next = *sequence + 1;

        match self.sender.try_send(GatewayMessage::dispatch(event, next, data)) {
            Ok(()) => {
                *sequence = next;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                drop(sequence);
                tracing::warn!(
                    session_id = %self.session_id,
                    user_id = %self.user_id(),
                    event = %event,
                    "Outbound queue full, closing slow connection"
                );
                self.request_close(CloseCode::UnknownError);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Enqueue a non-dispatch frame such as a heartbeat ack
    pub fn send(&self, message: GatewayMessage) -> bool {
        self.sender.try_send(message).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    // === Close ===

    /// Ask the socket task to close with `code`. Only the first request counts.
    pub fn request_close(&self, code: CloseCode) {
        if self.close_reason.set(code).is_ok() {
            self.close_signal.notify_one();
        }
    }

    /// Resolves once a close has been requested
    pub async fn close_requested(&self) -> CloseCode {
        loop {
            if let Some(code) = self.close_reason.get() {
                return *code;
            }
            self.close_signal.notified().await;
        }
    }

    // === Heartbeat ===

    pub fn record_heartbeat(&self) {
        *self.last_heartbeat.lock() = Instant::now();
    }

    pub fn time_since_heartbeat(&self) -> Duration {
        self.last_heartbeat.lock().elapsed()
    }

    // === Rate limiting ===

    /// Take one unit of the command quota. `false` means the command should be rejected.
    pub fn check_rate(&self) -> bool {
        self.limiter.check().is_ok()
    }

    // === Rooms ===

    /// Returns `true` if the room was not already joined
    pub(crate) fn add_room(&self, room_id: Snowflake) -> bool {
        self.rooms.write().insert(room_id)
    }

    /// Returns `true` if the room was joined
    pub(crate) fn remove_room(&self, room_id: Snowflake) -> bool {
        self.rooms.write().remove(&room_id)
    }

    pub fn is_in_room(&self, room_id: Snowflake) -> bool {
        self.rooms.read().contains(&room_id)
    }

    pub fn rooms(&self) -> Vec<Snowflake> {
        self.rooms.read().iter().copied().collect()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id())
            .field("sequence", &self.current_sequence())
            .field("rooms", &self.rooms.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RoomEvent;
    use crate::protocol::OpCode;
    use kizuna_core::UserProfile;

    fn connection(capacity: usize) -> (Arc<Connection>, mpsc::Receiver<GatewayMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        let identity = Identity::new(UserProfile::new(Snowflake::new(1), "alice"));
        let conn = Connection::new(
            "session-1".to_string(),
            identity,
            tx,
            command_quota(&RealtimeConfig::default()),
        );
        (conn, rx)
    }

    #[tokio::test]
    async fn test_dispatch_assigns_increasing_sequence() {
        let (conn, mut rx) = connection(8);
        let payload = RoomEvent {
            room_id: Snowflake::new(100),
        };

        assert!(conn.dispatch(GatewayEventType::RoomJoined, &payload));
        assert!(conn.dispatch(GatewayEventType::RoomLeft, &payload));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.op, OpCode::Dispatch);
        assert_eq!(first.s, Some(1));
        assert_eq!(first.t.as_deref(), Some("ROOM_JOINED"));
        assert_eq!(second.s, Some(2));
        assert_eq!(conn.current_sequence(), 2);
    }

    #[tokio::test]
    async fn test_full_queue_requests_close() {
        let (conn, _rx) = connection(1);
        let payload = RoomEvent {
            room_id: Snowflake::new(100),
        };

        assert!(conn.dispatch(GatewayEventType::RoomJoined, &payload));
        assert!(!conn.dispatch(GatewayEventType::RoomJoined, &payload));
        assert_eq!(conn.current_sequence(), 1);
        assert_eq!(conn.close_requested().await, CloseCode::UnknownError);
    }

    #[tokio::test]
    async fn test_first_close_reason_wins() {
        let (conn, _rx) = connection(1);
        conn.request_close(CloseCode::SessionTimeout);
        conn.request_close(CloseCode::UnknownError);
        assert_eq!(conn.close_requested().await, CloseCode::SessionTimeout);
    }

    #[test]
    fn test_rooms() {
        let (conn, _rx) = connection(1);
        let room = Snowflake::new(100);

        assert!(conn.add_room(room));
        assert!(!conn.add_room(room));
        assert!(conn.is_in_room(room));
        assert!(conn.remove_room(room));
        assert!(!conn.remove_room(room));
        assert!(conn.rooms().is_empty());
    }

    #[test]
    fn test_rate_limit_burst() {
        let (tx, _rx) = mpsc::channel(1);
        let config = RealtimeConfig {
            commands_per_second: 1,
            command_burst: 2,
            ..RealtimeConfig::default()
        };
        let conn = Connection::new(
            "s".into(),
            Identity::new(UserProfile::new(Snowflake::new(1), "alice")),
            tx,
            command_quota(&config),
        );

        assert!(conn.check_rate());
        assert!(conn.check_rate());
        assert!(!conn.check_rate());
    }

    #[test]
    fn test_heartbeat_tracking() {
        let (conn, _rx) = connection(1);
        conn.record_heartbeat();
        assert!(conn.time_since_heartbeat() < Duration::from_secs(1));
    }
}
