//! Push notification senders

use std::sync::Arc;

use axum::async_trait;

use super::{Notification, NotificationSender};
use crate::error::AppError;

/// Push gateway client
///
/// POSTs the notification JSON to the configured gateway, which owns
/// device tokens and fan-out to the targeted users or roles.
#[derive(Clone)]
pub struct HttpPushSender {
    http_client: Arc<reqwest::Client>,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpPushSender {
    pub fn new(http_client: Arc<reqwest::Client>, endpoint: String, api_key: Option<String>) -> Self {
        Self {
            http_client,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl NotificationSender for HttpPushSender {
    async fn send(&self, notification: Notification) -> Result<(), AppError> {
        let mut request = self.http_client.post(&self.endpoint).json(&notification);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            AppError::Notification(format!("Failed to reach push gateway: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::Notification(format!(
                "Push gateway rejected {} notification: HTTP {}",
                notification.kind,
                response.status()
            )));
        }

        tracing::debug!(kind = %notification.kind, "Push notification delivered");
        Ok(())
    }
}

/// Sender used when no push gateway is configured
#[derive(Debug, Clone, Default)]
pub struct LogOnlyPushSender;

#[async_trait]
impl NotificationSender for LogOnlyPushSender {
    async fn send(&self, notification: Notification) -> Result<(), AppError> {
        tracing::info!(
            kind = %notification.kind,
            target = ?notification.target,
            title = %notification.title,
            "Push notification (not delivered: no gateway configured)"
        );
        Ok(())
    }
}
