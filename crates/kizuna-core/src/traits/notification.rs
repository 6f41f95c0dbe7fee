//! Push-notification side channel

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::DomainError;
use crate::value_objects::Snowflake;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub user_id: Snowflake,
    pub title: String,
    pub body: String,
    pub data: Value,
}

/// Delivers notifications to users not reached by live fan-out.
///
/// Delivery is best-effort: callers log failures and move on.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: Notification) -> Result<(), DomainError>;
}
