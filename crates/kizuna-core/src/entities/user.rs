//! User profile snapshot

use crate::value_objects::Snowflake;

/// The subset of a user account the realtime core needs: enough to label
/// messages and notifications without another lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Snowflake,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserProfile {
    pub fn new(id: Snowflake, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            display_name: None,
            avatar_url: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }

    /// Display name if set and non-blank, otherwise the username.
    pub fn name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}
