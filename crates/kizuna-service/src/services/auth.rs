//! Authentication service
//!
//! Resolves the credential presented on a new connection into an identity.

use kizuna_core::{Snowflake, UserProfile};
use tracing::{debug, info, instrument};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Identity fixed on a connection once `Identify` succeeds
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub profile: UserProfile,
    /// Rooms the user may join, sent to the client in `READY`
    pub rooms: Vec<Snowflake>,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> Snowflake {
        self.profile.id
    }
}

pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Verify a bearer credential and load the user's profile and rooms.
    ///
    /// A failure to load the room seed list does not fail authentication;
    /// the client can still join rooms explicitly.
    #[instrument(skip(self, credential))]
    pub async fn authenticate(&self, credential: &str) -> ServiceResult<AuthenticatedUser> {
        if credential.trim().is_empty() {
            return Err(ServiceError::Unauthenticated);
        }

        let claims = self.ctx.jwt_service().validate_access_token(credential)?;
        let user_id = claims.user_id()?;

        let profile = self
            .ctx
            .user_repo()
            .find_by_id(user_id)
            .await
            .map_err(|e| ServiceError::internal(e.to_string()))?
            .ok_or(ServiceError::UnknownUser)?;

        let rooms = match self.ctx.room_repo().rooms_for_user(user_id).await {
            Ok(rooms) => rooms,
            Err(e) => {
                debug!(user_id = %user_id, error = %e, "Could not load room seed list");
                Vec::new()
            }
        };

        info!(user_id = %user_id, rooms = rooms.len(), "Connection authenticated");
        Ok(AuthenticatedUser { profile, rooms })
    }
}
