//! User model <-> entity mapper

use kizuna_core::{PresenceRecord, Snowflake, UserProfile};

use crate::models::{PresenceModel, UserModel};

impl From<UserModel> for UserProfile {
    fn from(model: UserModel) -> Self {
        UserProfile {
            id: Snowflake::new(model.id),
            username: model.username,
            display_name: model.display_name,
            avatar_url: model.avatar_url,
        }
    }
}

impl From<PresenceModel> for PresenceRecord {
    fn from(model: PresenceModel) -> Self {
        PresenceRecord {
            user_id: Snowflake::new(model.id),
            online: model.online,
            last_seen: model.last_seen_at.unwrap_or_default(),
        }
    }
}
