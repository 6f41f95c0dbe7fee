//! Room access checks
//!
//! Membership is read from the store on every call. Nothing is cached, so a
//! removed member loses access on their next join or send.

use kizuna_core::{MemberRole, Room, Snowflake};
use tracing::{debug, instrument};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// A room together with the caller's role in it
#[derive(Debug, Clone)]
pub struct RoomAccess {
    pub room: Room,
    pub role: MemberRole,
}

impl RoomAccess {
    /// Whether the caller may post, given the room's flags
    pub fn can_chat(&self) -> bool {
        !self.room.is_channel() || self.room.flags.members_can_chat() || self.role.can_moderate()
    }
}

pub struct AccessService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccessService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Resolve the room and the user's role in it.
    ///
    /// Unknown rooms, non-members and store failures all come back as
    /// `Forbidden` so callers cannot discover which rooms exist.
    #[instrument(skip(self))]
    pub async fn room_access(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<RoomAccess> {
        let room = match self.ctx.room_repo().find_by_id(room_id).await {
            Ok(Some(room)) => room,
            Ok(None) => {
                debug!(room_id = %room_id, "Unknown room");
                return Err(ServiceError::Forbidden);
            }
            Err(e) => {
                debug!(room_id = %room_id, error = %e, "Room lookup failed");
                return Err(ServiceError::Forbidden);
            }
        };

        match self.ctx.room_repo().membership(room_id, user_id).await {
            Ok(Some(role)) => Ok(RoomAccess { room, role }),
            Ok(None) => {
                debug!(room_id = %room_id, user_id = %user_id, "Not a room member");
                Err(ServiceError::Forbidden)
            }
            Err(e) => {
                debug!(room_id = %room_id, error = %e, "Membership lookup failed");
                Err(ServiceError::Forbidden)
            }
        }
    }

    /// Membership check used by room joins
    pub async fn can_join(&self, room_id: Snowflake, user_id: Snowflake) -> bool {
        self.room_access(room_id, user_id).await.is_ok()
    }

    /// Membership plus the room's chat flag, used by sends, edits and typing
    pub async fn require_chat(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<RoomAccess> {
        let access = self.room_access(room_id, user_id).await?;
        if !access.can_chat() {
            debug!(room_id = %room_id, user_id = %user_id, "Members cannot chat in this room");
            return Err(ServiceError::Forbidden);
        }
        Ok(access)
    }
}
