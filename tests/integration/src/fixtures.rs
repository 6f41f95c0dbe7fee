//! Test fixtures
//!
//! Three users and two servers. Alice, Bob and Carol share `#general`; only
//! Alice belongs to the server that owns `#secret`.
//!
//! The store wrappers below delay or fail selected calls and delegate the
//! rest to the shared [`MemoryStore`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kizuna_core::{
    DomainError, MemberRole, Message, MessageQuery, MessageRepository, Notification,
    NotificationDispatcher, PresenceRecord, PresenceRepository, ReadReceipt, RepoResult, Room,
    Snowflake, UserProfile,
};
use kizuna_db::MemoryStore;
use parking_lot::Mutex;

pub const JWT_SECRET: &str = "integration-secret";

pub const ALICE: Snowflake = Snowflake::new(1);
pub const BOB: Snowflake = Snowflake::new(2);
pub const CAROL: Snowflake = Snowflake::new(3);

pub const COMMUNITY: Snowflake = Snowflake::new(100);
pub const PRIVATE_SERVER: Snowflake = Snowflake::new(200);

pub const GENERAL: Snowflake = Snowflake::new(1000);
pub const SECRET: Snowflake = Snowflake::new(2000);

/// Build the shared in-memory world
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    store.insert_user(UserProfile::new(ALICE, "alice").with_display_name("Alice"));
    store.insert_user(UserProfile::new(BOB, "bob"));
    store.insert_user(UserProfile::new(CAROL, "carol"));

    store.insert_room(Room::new_channel(GENERAL, COMMUNITY, "general"));
    store.insert_room(Room::new_channel(SECRET, PRIVATE_SERVER, "secret"));

    store.add_server_member(COMMUNITY, ALICE, MemberRole::Owner);
    store.add_server_member(COMMUNITY, BOB, MemberRole::Member);
    store.add_server_member(COMMUNITY, CAROL, MemberRole::Member);
    store.add_server_member(PRIVATE_SERVER, ALICE, MemberRole::Owner);

    store
}

/// Notifier that records every notification it is handed.
///
/// After [`CapturingNotifier::fail_deliveries`] it still records, then
/// reports the delivery as failed.
#[derive(Debug, Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl CapturingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, user_id: Snowflake) -> Vec<Notification> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for CapturingNotifier {
    async fn dispatch(&self, notification: Notification) -> Result<(), DomainError> {
        self.sent.lock().push(notification);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::InternalError("push gateway unavailable".into()));
        }
        Ok(())
    }
}

/// Presence store whose writes take `delay`
pub struct SlowPresence {
    inner: Arc<MemoryStore>,
    delay: Duration,
}

impl SlowPresence {
    pub fn new(inner: Arc<MemoryStore>, delay: Duration) -> Arc<Self> {
        Arc::new(Self { inner, delay })
    }
}

#[async_trait]
impl PresenceRepository for SlowPresence {
    async fn save(&self, record: &PresenceRecord) -> RepoResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(record).await
    }

    async fn find(&self, user_id: Snowflake) -> RepoResult<Option<PresenceRecord>> {
        self.inner.find(user_id).await
    }
}

/// Message store with switchable outages
pub struct FlakyMessages {
    inner: Arc<MemoryStore>,
    fail_inserts: AtomicBool,
    fail_summaries: AtomicBool,
}

impl FlakyMessages {
    pub fn new(inner: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_inserts: AtomicBool::new(false),
            fail_summaries: AtomicBool::new(false),
        })
    }

    pub fn fail_inserts(&self, failing: bool) {
        self.fail_inserts.store(failing, Ordering::SeqCst);
    }

    pub fn fail_summaries(&self, failing: bool) {
        self.fail_summaries.store(failing, Ordering::SeqCst);
    }

    fn outage() -> DomainError {
        DomainError::DatabaseError("connection refused".into())
    }
}

#[async_trait]
impl MessageRepository for FlakyMessages {
    async fn create(&self, message: &Message) -> RepoResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.create(message).await
    }

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_room(
        &self,
        room_id: Snowflake,
        query: MessageQuery,
    ) -> RepoResult<Vec<Message>> {
        self.inner.find_by_room(room_id, query).await
    }

    async fn update_content(&self, message: &Message) -> RepoResult<()> {
        self.inner.update_content(message).await
    }

    async fn mark_deleted(&self, id: Snowflake) -> RepoResult<()> {
        self.inner.mark_deleted(id).await
    }

    async fn append_read_receipt(&self, receipt: &ReadReceipt) -> RepoResult<()> {
        self.inner.append_read_receipt(receipt).await
    }

    async fn update_room_summary(
        &self,
        room_id: Snowflake,
        preview: &str,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        if self.fail_summaries.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.update_room_summary(room_id, preview, at).await
    }
}
