//! Message service
//!
//! Validation, mention resolution and persistence for message commands.
//! Fan-out is the gateway's job; this service only ever touches the store.

use chrono::Utc;
use kizuna_core::entities::{Message, ReadReceipt, Room};
use kizuna_core::traits::MessageQuery;
use kizuna_core::{extract_mention_names, Mention, Snowflake};
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::dto::{validation_reason, EditMessageRequest, SendMessageRequest};

use super::access::AccessService;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::notification::preview_text;

/// A persisted message and the room it was authorised against
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub room: Room,
}

pub struct MessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Authorise, validate, enrich and persist a new message.
    ///
    /// Nothing is written unless every check passes. The room summary update
    /// is handed to the background pool after the insert succeeds.
    #[instrument(skip(self, request), fields(room_id = %request.room_id))]
    pub async fn send(
        &self,
        author_id: Snowflake,
        request: SendMessageRequest,
    ) -> ServiceResult<SentMessage> {
        let access = AccessService::new(self.ctx)
            .require_chat(request.room_id, author_id)
            .await?;

        if request.is_blank() {
            return Err(ServiceError::invalid_message(
                "Message has no content or attachments",
            ));
        }
        request
            .validate()
            .map_err(|e| ServiceError::InvalidMessage(validation_reason(&e)))?;

        if let Some(reply_to_id) = request.reply_to_id {
            self.check_reply_target(request.room_id, reply_to_id).await?;
        }

        let mentions = self.resolve_mentions(&request.content).await;

        let message = Message::new(
            self.ctx.generate_id(),
            request.room_id,
            author_id,
            request.content,
        )
        .with_attachments(request.attachments)
        .with_mentions(mentions)
        .with_reply_to(request.reply_to_id);

        self.ctx
            .message_repo()
            .create(&message)
            .await
            .map_err(|e| ServiceError::persistence(&e))?;

        info!(message_id = %message.id, room_id = %message.room_id, "Message created");

        self.schedule_room_summary(&message);

        Ok(SentMessage {
            message,
            room: access.room,
        })
    }

    /// Load a message, deleted or not
    pub async fn find(&self, message_id: Snowflake) -> ServiceResult<Option<Message>> {
        self.ctx
            .message_repo()
            .find_by_id(message_id)
            .await
            .map_err(|e| ServiceError::internal(e.to_string()))
    }

    /// Load a message that has not been deleted
    pub async fn find_live(&self, message_id: Snowflake) -> ServiceResult<Message> {
        match self.find(message_id).await? {
            Some(message) if !message.deleted => Ok(message),
            _ => Err(ServiceError::not_found("Message", message_id.to_string())),
        }
    }

    /// Replace the body of the editor's own message
    #[instrument(skip(self, message, request), fields(message_id = %message.id))]
    pub async fn edit(
        &self,
        editor_id: Snowflake,
        mut message: Message,
        request: EditMessageRequest,
    ) -> ServiceResult<Message> {
        if message.author_id != editor_id {
            return Err(ServiceError::Forbidden);
        }
        AccessService::new(self.ctx)
            .require_chat(message.room_id, editor_id)
            .await?;

        if request.content.trim().is_empty() && message.attachments.is_empty() {
            return Err(ServiceError::invalid_message(
                "Message has no content or attachments",
            ));
        }
        request
            .validate()
            .map_err(|e| ServiceError::InvalidMessage(validation_reason(&e)))?;

        let mentions = self.resolve_mentions(&request.content).await;
        message.edit(request.content, mentions);

        self.ctx
            .message_repo()
            .update_content(&message)
            .await
            .map_err(|e| ServiceError::persistence(&e))?;

        info!(message_id = %message.id, "Message edited");
        Ok(message)
    }

    /// Soft-delete a message. Authors may delete their own; moderators and
    /// owners may delete anyone's.
    #[instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn delete(&self, actor_id: Snowflake, mut message: Message) -> ServiceResult<Message> {
        let access = AccessService::new(self.ctx)
            .room_access(message.room_id, actor_id)
            .await?;

        if message.author_id != actor_id && !access.role.can_moderate() {
            return Err(ServiceError::Forbidden);
        }

        self.ctx
            .message_repo()
            .mark_deleted(message.id)
            .await
            .map_err(|e| ServiceError::persistence(&e))?;

        message.mark_deleted();
        info!(message_id = %message.id, actor_id = %actor_id, "Message deleted");
        Ok(message)
    }

    /// Append a read receipt for a member of the message's room
    #[instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn mark_read(
        &self,
        reader_id: Snowflake,
        message: &Message,
    ) -> ServiceResult<ReadReceipt> {
        AccessService::new(self.ctx)
            .room_access(message.room_id, reader_id)
            .await?;

        let receipt = ReadReceipt {
            message_id: message.id,
            room_id: message.room_id,
            user_id: reader_id,
            read_at: Utc::now(),
        };

        self.ctx
            .message_repo()
            .append_read_receipt(&receipt)
            .await
            .map_err(|e| ServiceError::persistence(&e))?;

        debug!(message_id = %message.id, user_id = %reader_id, "Read receipt appended");
        Ok(receipt)
    }

    /// Page through a room's stored history
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        user_id: Snowflake,
        room_id: Snowflake,
        query: MessageQuery,
    ) -> ServiceResult<Vec<Message>> {
        AccessService::new(self.ctx)
            .room_access(room_id, user_id)
            .await?;

        self.ctx
            .message_repo()
            .find_by_room(room_id, query)
            .await
            .map_err(|e| ServiceError::internal(e.to_string()))
    }

    /// Resolve `@username` tokens to users. Unknown names stay literal text;
    /// lookup failures are logged and skipped.
    pub async fn resolve_mentions(&self, content: &str) -> Vec<Mention> {
        let mut mentions = Vec::new();
        for name in extract_mention_names(content) {
            match self.ctx.user_repo().find_by_username(&name).await {
                Ok(Some(user_id)) => {
                    if !mentions.iter().any(|m: &Mention| m.user_id == user_id) {
                        mentions.push(Mention::new(user_id, name));
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(username = %name, error = %e, "Mention lookup failed"),
            }
        }
        mentions
    }

    async fn check_reply_target(
        &self,
        room_id: Snowflake,
        reply_to_id: Snowflake,
    ) -> ServiceResult<()> {
        match self.ctx.message_repo().find_by_id(reply_to_id).await {
            Ok(Some(target)) if target.room_id != room_id => Err(ServiceError::invalid_message(
                "Reply target belongs to another room",
            )),
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                warn!(reply_to_id = %reply_to_id, "Reply target not found, keeping reference");
                Ok(())
            }
            Err(e) => {
                warn!(reply_to_id = %reply_to_id, error = %e, "Reply target lookup failed");
                Ok(())
            }
        }
    }

    fn schedule_room_summary(&self, message: &Message) {
        let repo = self.ctx.message_repo_arc();
        let room_id = message.room_id;
        let preview = preview_text(message);
        let at = message.created_at;

        self.ctx.task_pool().spawn("room_summary", async move {
            repo.update_room_summary(room_id, &preview, at).await
        });
    }
}
