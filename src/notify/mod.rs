//! Backup notifications
//!
//! The orchestrator reports the outcome of each pipeline run through a
//! `Notifier`. Delivery is fire-and-forget: a notifier error is logged by the
//! caller and never changes the outcome of the backup itself.

mod webhook;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::VaultResult;

pub use webhook::WebhookNotifier;

/// Payload for a completed backup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEvent {
    #[serde(rename = "sizeMB")]
    pub size_mb: f64,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

/// Sink for backup outcome events
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_success(&self, event: &SuccessEvent) -> VaultResult<()>;

    /// `context` names the pipeline stage that failed
    async fn notify_error(&self, error: &str, context: &str) -> VaultResult<()>;
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_success(&self, event: &SuccessEvent) -> VaultResult<()> {
        tracing::info!(
            file_name = %event.file_name,
            size_mb = event.size_mb,
            destination = event.destination.as_deref().unwrap_or("unknown"),
            "backup completed"
        );
        Ok(())
    }

    async fn notify_error(&self, error: &str, context: &str) -> VaultResult<()> {
        tracing::error!(%error, %context, "backup failed");
        Ok(())
    }
}
