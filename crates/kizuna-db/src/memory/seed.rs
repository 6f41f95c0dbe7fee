//! JSON fixtures for the in-memory backend
//!
//! ```json
//! {
//!   "users": [{ "id": "1", "username": "alice", "display_name": "Alice" }],
//!   "servers": [{ "id": "100", "members": [{ "user_id": "1", "role": "owner" }] }],
//!   "rooms": [
//!     { "id": "10", "server_id": "100", "name": "general" },
//!     { "id": "20", "participants": ["1", "2"] }
//!   ]
//! }
//! ```

use std::path::Path;

use kizuna_core::{DomainError, MemberRole, Room, RoomFlags, Snowflake, UserProfile};
use serde::Deserialize;

use super::MemoryStore;

#[derive(Debug, Default, Deserialize)]
pub struct MemorySeed {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub servers: Vec<SeedServer>,
    #[serde(default)]
    pub rooms: Vec<SeedRoom>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedServer {
    pub id: Snowflake,
    #[serde(default)]
    pub members: Vec<SeedMember>,
}

#[derive(Debug, Deserialize)]
pub struct SeedMember {
    pub user_id: Snowflake,
    #[serde(default)]
    pub role: MemberRole,
}

#[derive(Debug, Deserialize)]
pub struct SeedRoom {
    pub id: Snowflake,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub server_id: Option<Snowflake>,
    #[serde(default)]
    pub participants: Vec<Snowflake>,
    #[serde(default)]
    pub flags: Option<RoomFlags>,
}

impl MemorySeed {
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        serde_json::from_str(json)
            .map_err(|e| DomainError::ValidationError(format!("invalid seed: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DomainError::InternalError(format!("cannot read seed {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}

impl MemoryStore {
    /// Load fixtures; rooms must be either a channel or a two-person conversation.
    pub fn apply_seed(&self, seed: MemorySeed) -> Result<(), DomainError> {
        for user in seed.users {
            self.insert_user(UserProfile {
                id: user.id,
                username: user.username,
                display_name: user.display_name,
                avatar_url: user.avatar_url,
            });
        }

        for server in seed.servers {
            for member in server.members {
                self.add_server_member(server.id, member.user_id, member.role);
            }
        }

        for room in seed.rooms {
            let mut entity = match (room.server_id, room.participants.as_slice()) {
                (Some(server_id), []) => {
                    Room::new_channel(room.id, server_id, room.name.unwrap_or_default())
                }
                (None, [a, b]) => Room::new_conversation(room.id, *a, *b),
                _ => {
                    return Err(DomainError::ValidationError(format!(
                        "seed room {} needs a server_id or exactly two participants",
                        room.id
                    )))
                }
            };
            if let Some(flags) = room.flags {
                entity = entity.with_flags(flags);
            }
            self.insert_room(entity);
        }

        Ok(())
    }
}
