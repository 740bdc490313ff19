//! HTTP webhook notifier

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{Notifier, SuccessEvent};
use crate::error::{VaultError, VaultResult};

/// Posts backup events as JSON to a configured URL
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> VaultResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("storevault/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VaultError::Notification(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn post(&self, body: serde_json::Value) -> VaultResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VaultError::Notification(format!("Webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VaultError::Notification(format!(
                "Webhook returned non-2xx status: {}",
                status
            )));
        }

        tracing::debug!(url = %self.url, status = status.as_u16(), "webhook delivered");
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_success(&self, event: &SuccessEvent) -> VaultResult<()> {
        self.post(json!({ "event": "backup.success", "backup": event }))
            .await
    }

    async fn notify_error(&self, error: &str, context: &str) -> VaultResult<()> {
        self.post(json!({ "event": "backup.error", "error": error, "context": context }))
            .await
    }
}
