//! Message model <-> entity mapper

use kizuna_core::{Message, Snowflake};

use crate::models::MessageModel;

impl From<MessageModel> for Message {
    fn from(model: MessageModel) -> Self {
        let deleted = model.is_deleted();
        Message {
            id: Snowflake::new(model.id),
            room_id: Snowflake::new(model.room_id),
            author_id: Snowflake::new(model.author_id),
            content: model.content,
            attachments: model.attachments.0,
            mentions: model.mentions.0,
            reply_to_id: model.reply_to_id.map(Snowflake::new),
            created_at: model.created_at,
            edited_at: model.edited_at,
            deleted,
        }
    }
}
