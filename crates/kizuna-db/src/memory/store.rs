//! In-memory implementation of every repository trait
//!
//! Backs `STORE_BACKEND=memory` for local development and the test suites.
//! Locks are never held across an await point.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kizuna_core::{
    DomainError, MemberRole, Message, MessageQuery, MessageRepository, PresenceRecord,
    PresenceRepository, ReadReceipt, RepoResult, Room, RoomFlags, RoomKind, RoomRepository,
    Snowflake, UserProfile, UserRepository,
};
use parking_lot::RwLock;

#[derive(Default)]
struct State {
    users: HashMap<Snowflake, UserProfile>,
    /// lowercase username -> id
    usernames: HashMap<String, Snowflake>,
    server_members: HashMap<Snowflake, HashMap<Snowflake, MemberRole>>,
    rooms: HashMap<Snowflake, Room>,
    messages: BTreeMap<Snowflake, Message>,
    receipts: HashMap<(Snowflake, Snowflake), ReadReceipt>,
    presence: HashMap<Snowflake, PresenceRecord>,
}

impl State {
    fn membership(&self, room: &Room, user_id: Snowflake) -> Option<MemberRole> {
        match room.kind {
            RoomKind::Conversation { participants } => participants
                .contains(&user_id)
                .then_some(MemberRole::Member),
            RoomKind::Channel { server_id } => self
                .server_members
                .get(&server_id)
                .and_then(|members| members.get(&user_id).copied()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: UserProfile) {
        let mut state = self.state.write();
        state.usernames.insert(user.username.to_lowercase(), user.id);
        state.users.insert(user.id, user);
    }

    pub fn remove_user(&self, user_id: Snowflake) {
        let mut state = self.state.write();
        if let Some(user) = state.users.remove(&user_id) {
            state.usernames.remove(&user.username.to_lowercase());
        }
    }

    pub fn insert_room(&self, room: Room) {
        self.state.write().rooms.insert(room.id, room);
    }

    pub fn set_room_flags(&self, room_id: Snowflake, flags: RoomFlags) {
        if let Some(room) = self.state.write().rooms.get_mut(&room_id) {
            room.flags = flags;
        }
    }

    pub fn add_server_member(&self, server_id: Snowflake, user_id: Snowflake, role: MemberRole) {
        self.state
            .write()
            .server_members
            .entry(server_id)
            .or_default()
            .insert(user_id, role);
    }

    pub fn remove_server_member(&self, server_id: Snowflake, user_id: Snowflake) {
        if let Some(members) = self.state.write().server_members.get_mut(&server_id) {
            members.remove(&user_id);
        }
    }

    /// Receipts recorded for a message, oldest first
    pub fn read_receipts(&self, message_id: Snowflake) -> Vec<ReadReceipt> {
        let mut receipts: Vec<_> = self
            .state
            .read()
            .receipts
            .values()
            .filter(|r| r.message_id == message_id)
            .copied()
            .collect();
        receipts.sort_by_key(|r| r.read_at);
        receipts
    }

    pub fn message_count(&self) -> usize {
        self.state.read().messages.len()
    }

    pub fn room(&self, room_id: Snowflake) -> Option<Room> {
        self.state.read().rooms.get(&room_id).cloned()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<UserProfile>> {
        Ok(self.state.read().users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<Snowflake>> {
        Ok(self
            .state
            .read()
            .usernames
            .get(&username.to_lowercase())
            .copied())
    }
}

#[async_trait]
impl RoomRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Room>> {
        Ok(self.state.read().rooms.get(&id).cloned())
    }

    async fn membership(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<MemberRole>> {
        let state = self.state.read();
        Ok(state
            .rooms
            .get(&room_id)
            .and_then(|room| state.membership(room, user_id)))
    }

    async fn member_ids(&self, room_id: Snowflake) -> RepoResult<Vec<Snowflake>> {
        let state = self.state.read();
        let Some(room) = state.rooms.get(&room_id) else {
            return Ok(Vec::new());
        };

        let mut ids: Vec<Snowflake> = match room.kind {
            RoomKind::Conversation { participants } => participants.to_vec(),
            RoomKind::Channel { server_id } => state
                .server_members
                .get(&server_id)
                .map(|members| members.keys().copied().collect())
                .unwrap_or_default(),
        };
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn rooms_for_user(&self, user_id: Snowflake) -> RepoResult<Vec<Snowflake>> {
        let state = self.state.read();
        let mut ids: Vec<Snowflake> = state
            .rooms
            .values()
            .filter(|room| state.membership(room, user_id).is_some())
            .map(|room| room.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn create(&self, message: &Message) -> RepoResult<()> {
        let mut state = self.state.write();
        if state.messages.contains_key(&message.id) {
            return Err(DomainError::DatabaseError(format!(
                "duplicate message id {}",
                message.id
            )));
        }
        state.messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>> {
        Ok(self.state.read().messages.get(&id).cloned())
    }

    async fn find_by_room(
        &self,
        room_id: Snowflake,
        query: MessageQuery,
    ) -> RepoResult<Vec<Message>> {
        let limit = usize::try_from(query.effective_limit()).unwrap_or(50);
        let state = self.state.read();
        let visible = state
            .messages
            .values()
            .filter(|m| m.room_id == room_id && !m.deleted);

        let page = match (query.before, query.after) {
            (Some(before), _) => visible
                .filter(|m| m.id < before)
                .rev()
                .take(limit)
                .cloned()
                .collect(),
            (None, Some(after)) => visible
                .filter(|m| m.id > after)
                .take(limit)
                .cloned()
                .collect(),
            (None, None) => visible.rev().take(limit).cloned().collect(),
        };
        Ok(page)
    }

    async fn update_content(&self, message: &Message) -> RepoResult<()> {
        let mut state = self.state.write();
        match state.messages.get_mut(&message.id) {
            Some(stored) if !stored.deleted => {
                stored.content.clone_from(&message.content);
                stored.mentions.clone_from(&message.mentions);
                stored.edited_at = Some(message.edited_at.unwrap_or_else(Utc::now));
                Ok(())
            }
            _ => Err(DomainError::MessageNotFound(message.id)),
        }
    }

    async fn mark_deleted(&self, id: Snowflake) -> RepoResult<()> {
        let mut state = self.state.write();
        match state.messages.get_mut(&id) {
            Some(stored) if !stored.deleted => {
                stored.mark_deleted();
                Ok(())
            }
            _ => Err(DomainError::MessageNotFound(id)),
        }
    }

    async fn append_read_receipt(&self, receipt: &ReadReceipt) -> RepoResult<()> {
        self.state
            .write()
            .receipts
            .entry((receipt.message_id, receipt.user_id))
            .or_insert(*receipt);
        Ok(())
    }

    async fn update_room_summary(
        &self,
        room_id: Snowflake,
        preview: &str,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut state = self.state.write();
        if let Some(room) = state.rooms.get_mut(&room_id) {
            if room.last_message_at.map_or(true, |last| last <= at) {
                room.set_summary(preview.to_string(), at);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PresenceRepository for MemoryStore {
    async fn save(&self, record: &PresenceRecord) -> RepoResult<()> {
        self.state.write().presence.insert(record.user_id, *record);
        Ok(())
    }

    async fn find(&self, user_id: Snowflake) -> RepoResult<Option<PresenceRecord>> {
        Ok(self.state.read().presence.get(&user_id).copied())
    }
}
