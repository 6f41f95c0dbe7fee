//! Notification dispatcher implementations
//!
//! Push delivery itself belongs to an external provider. These adapters
//! either log the notification or hand it to a webhook that fronts one.

use std::time::Duration;

use async_trait::async_trait;
use kizuna_core::{DomainError, Notification, NotificationDispatcher};
use tracing::{debug, info};

/// Logs every notification at `info`. Used when no webhook is configured.
#[derive(Debug, Default, Clone)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<(), DomainError> {
        info!(
            user_id = %notification.user_id,
            title = %notification.title,
            body = %notification.body,
            "Push notification"
        );
        Ok(())
    }
}

/// POSTs each notification as JSON to a configured URL
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
    url: String,
}

impl WebhookDispatcher {
    const TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(url: impl Into<String>) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(|e| DomainError::NotificationError(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<(), DomainError> {
        let response = self
            .client
            .post(&self.url)
            .json(&notification)
            .send()
            .await
            .map_err(|e| DomainError::NotificationError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::NotificationError(format!(
                "webhook responded with {status}"
            )));
        }

        debug!(user_id = %notification.user_id, "Notification delivered to webhook");
        Ok(())
    }
}
