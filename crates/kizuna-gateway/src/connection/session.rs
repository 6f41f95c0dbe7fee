//! Connection identity

use kizuna_core::{Snowflake, UserProfile};
use kizuna_service::AuthenticatedUser;

/// Who is on the other end of a connection.
///
/// Fixed when `Identify` succeeds and never replaced; command payloads
/// cannot carry or override it.
#[derive(Debug, Clone)]
pub struct Identity {
    profile: UserProfile,
}

impl Identity {
    pub fn new(profile: UserProfile) -> Self {
        Self { profile }
    }

    pub fn user_id(&self) -> Snowflake {
        self.profile.id
    }

    /// Profile snapshot taken at authentication time
    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }
}

impl From<&AuthenticatedUser> for Identity {
    fn from(user: &AuthenticatedUser) -> Self {
        Self::new(user.profile.clone())
    }
}

/// Generate a new session ID
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
