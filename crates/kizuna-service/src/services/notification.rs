//! Offline notifications
//!
//! Members of a room who were not reached by live fan-out get a push
//! notification instead. Everything here is best-effort and runs on the
//! background pool.

use std::collections::HashSet;

use kizuna_core::{truncate_preview, Message, Notification, Room, Snowflake, UserProfile};
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::context::ServiceContext;

/// Characters of message body carried in previews and notification bodies
pub const PREVIEW_CHARS: usize = 120;

const ATTACHMENT_ONLY_TEXT: &str = "Sent an attachment";

/// Short text for room lists and notification bodies
pub fn preview_text(message: &Message) -> String {
    if message.content.trim().is_empty() {
        ATTACHMENT_ONLY_TEXT.to_string()
    } else {
        truncate_preview(message.content.trim(), PREVIEW_CHARS)
    }
}

/// Build the notification `recipient` receives for `message`
pub fn build_notification(
    author: &UserProfile,
    room: &Room,
    message: &Message,
    recipient: Snowflake,
) -> Notification {
    let author_name = author.name();
    let title = if message.mentions_user(recipient) {
        format!("{author_name} mentioned you")
    } else {
        match room.name.as_deref() {
            Some(room_name) if room.is_channel() => format!("{author_name} in #{room_name}"),
            _ => author_name.to_string(),
        }
    };

    Notification {
        user_id: recipient,
        title,
        body: preview_text(message),
        data: json!({
            "type": "message",
            "room_id": message.room_id,
            "message_id": message.id,
            "author_id": message.author_id,
        }),
    }
}

pub struct NotificationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> NotificationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Notify every room member except the author and the users in
    /// `reached`. Returns `false` when the pool dropped the job.
    #[instrument(skip_all, fields(message_id = %message.id, room_id = %room.id))]
    pub fn notify_unreached(
        &self,
        author: UserProfile,
        room: Room,
        message: Message,
        reached: HashSet<Snowflake>,
    ) -> bool {
        let ctx = self.ctx.clone();

        self.ctx.task_pool().spawn("offline_notify", async move {
            let members = ctx.room_repo().member_ids(room.id).await?;
            let notifier = ctx.notifier();

            for recipient in members
                .into_iter()
                .filter(|id| *id != author.id && !reached.contains(id))
            {
                let notification = build_notification(&author, &room, &message, recipient);
                match notifier.dispatch(notification).await {
                    Ok(()) => debug!(user_id = %recipient, "Offline notification sent"),
                    Err(e) => warn!(user_id = %recipient, error = %e, "Notification dispatch failed"),
                }
            }
            Ok::<(), kizuna_core::DomainError>(())
        })
    }
}
