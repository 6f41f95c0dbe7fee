//! Room model <-> entity mapper

use kizuna_core::{DomainError, Room, RoomFlags, RoomKind, Snowflake};

use crate::models::RoomModel;

impl TryFrom<RoomModel> for Room {
    type Error = DomainError;

    fn try_from(model: RoomModel) -> Result<Self, Self::Error> {
        let kind = match (model.kind, model.server_id) {
            (RoomModel::KIND_CHANNEL, Some(server_id)) => RoomKind::Channel {
                server_id: Snowflake::new(server_id),
            },
            (RoomModel::KIND_CONVERSATION, None) => match model.participants.as_slice() {
                [a, b] => RoomKind::Conversation {
                    participants: [Snowflake::new(*a), Snowflake::new(*b)],
                },
                other => {
                    return Err(DomainError::DatabaseError(format!(
                        "conversation {} has {} participants",
                        model.id,
                        other.len()
                    )))
                }
            },
            (kind, _) => {
                return Err(DomainError::DatabaseError(format!(
                    "room {} has inconsistent kind {kind}",
                    model.id
                )))
            }
        };

        Ok(Room {
            id: Snowflake::new(model.id),
            kind,
            name: model.name,
            flags: RoomFlags::from_db(model.flags),
            last_message_preview: model.last_message_preview,
            last_message_at: model.last_message_at,
            created_at: model.created_at,
        })
    }
}
