//! Backup orchestrator
//!
//! Runs the creation pipeline (snapshot, serialize, optional encryption,
//! upload) and the folder-level operations on stored backups. Every public
//! method returns a `PipelineFailure` instead of panicking.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::failure::{at, PipelineFailure, PipelineStage};
use crate::config::settings::{BackupSettings, Settings};
use crate::crypto::{checksum, CryptoEngine, EnvelopeVersion};
use crate::error::VaultResult;
use crate::notify::{Notifier, SuccessEvent};
use crate::remote::{with_deadline, RemoteFile, RemoteStore};
use crate::snapshot::{DataSource, SnapshotBuilder, TableRegistry};

const MIME_TYPE: &str = "application/json";
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Per-run switches for `create_backup`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupOptions {
    pub encrypt: bool,
    pub include_metadata: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            encrypt: true,
            include_metadata: true,
        }
    }
}

impl From<&BackupSettings> for BackupOptions {
    fn from(settings: &BackupSettings) -> Self {
        Self {
            encrypt: settings.encrypt,
            include_metadata: settings.include_metadata,
        }
    }
}

/// Descriptive record of one uploaded backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub id: Uuid,
    pub file_name: String,
    #[serde(rename = "sizeMB")]
    pub size_mb: f64,
    pub created_at: DateTime<Utc>,
    pub encrypted: bool,
    /// SHA-256 of the uploaded bytes
    pub checksum: String,
}

/// Result of a successful `create_backup`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub file_id: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(rename = "sizeMB")]
    pub size_mb: f64,
    pub metadata: BackupMetadata,
    /// Non-empty tables in the snapshot
    pub snapshot_tables: usize,
    pub total_records: usize,
}

/// Drives snapshot, encryption and remote storage for backups
pub struct BackupOrchestrator {
    builder: SnapshotBuilder,
    pub(super) registry: TableRegistry,
    pub(super) crypto: CryptoEngine,
    pub(super) store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    environment: String,
    folder_name: String,
    envelope_version: EnvelopeVersion,
    pub(super) deadline: Duration,
    defaults: BackupOptions,
    folder_id: OnceCell<String>,
}

impl BackupOrchestrator {
    /// Wire an orchestrator from settings and its collaborators
    pub fn new(
        settings: &Settings,
        source: Arc<dyn DataSource>,
        crypto: CryptoEngine,
        store: Arc<dyn RemoteStore>,
        notifier: Arc<dyn Notifier>,
    ) -> VaultResult<Self> {
        settings.validate()?;
        let registry = settings.table_registry()?;
        let builder = SnapshotBuilder::new(source, settings.environment.clone())
            .with_read_concurrency(settings.backup.read_concurrency);

        Ok(Self {
            builder,
            registry,
            crypto,
            store,
            notifier,
            environment: settings.environment.clone(),
            folder_name: settings.backup.folder_name.clone(),
            envelope_version: settings.envelope_version,
            deadline: Duration::from_secs(settings.remote.timeout_secs),
            defaults: BackupOptions::from(&settings.backup),
            folder_id: OnceCell::new(),
        })
    }

    /// Options taken from settings
    pub fn default_options(&self) -> BackupOptions {
        self.defaults
    }

    pub fn crypto(&self) -> &CryptoEngine {
        &self.crypto
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    /// Destination label of the configured store
    pub fn destination(&self) -> String {
        self.store.destination()
    }

    /// Create and upload a backup, then notify
    pub async fn create_backup(
        &self,
        options: BackupOptions,
    ) -> Result<BackupReport, PipelineFailure> {
        let start = std::time::Instant::now();
        let result = AssertUnwindSafe(self.run_backup(options))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(PipelineFailure::from_panic(panic)));

        match &result {
            Ok(report) => {
                tracing::info!(
                    file_id = %report.file_id,
                    size_mb = report.size_mb,
                    encrypted = report.metadata.encrypted,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "backup created"
                );
                let event = SuccessEvent {
                    size_mb: report.size_mb,
                    file_name: report.file_name.clone(),
                    created_at: report.metadata.created_at,
                    destination: Some(self.store.destination()),
                };
                self.deliver("success", self.notifier.notify_success(&event))
                    .await;
            }
            Err(failure) => {
                tracing::error!(stage = %failure.stage, error = %failure.error, "backup failed");
                let message = failure.error.to_string();
                self.deliver(
                    "failure",
                    self.notifier.notify_error(&message, failure.stage.as_str()),
                )
                .await;
            }
        }

        result
    }

    /// Await a notification without letting it fail, stall or unwind the backup
    async fn deliver<F>(&self, kind: &str, notification: F)
    where
        F: Future<Output = VaultResult<()>>,
    {
        let delivered = tokio::time::timeout(
            self.deadline,
            AssertUnwindSafe(notification).catch_unwind(),
        )
        .await;

        match delivered {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::warn!(kind, error = %e, "notification not delivered"),
            Ok(Err(_)) => tracing::warn!(kind, "notifier panicked"),
            Err(_) => tracing::warn!(kind, deadline = ?self.deadline, "notification timed out"),
        }
    }

    async fn run_backup(&self, options: BackupOptions) -> Result<BackupReport, PipelineFailure> {
        let tables = self.registry.names();
        let mut snapshot = self.builder.build(&tables).await;
        if !options.include_metadata {
            snapshot = snapshot.without_metadata();
        }
        let snapshot_tables = snapshot.tables_restored();
        let total_records = snapshot.total_records();

        let plain = snapshot
            .to_json_bytes()
            .map_err(at(PipelineStage::Serialize))?;

        let (bytes, encrypted) = if !options.encrypt {
            (plain, false)
        } else if !self.crypto.is_configured() {
            tracing::warn!("encryption requested but no key is configured, uploading plaintext");
            (plain, false)
        } else {
            (self.seal(plain).await?, true)
        };

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let file_name = backup_file_name(created_at, id, encrypted);
        let size_mb = round_mb(bytes.len());
        let checksum = checksum(&bytes);
        let description = format!(
            "StoreVault {} backup: {} records in {} tables",
            self.environment, total_records, snapshot_tables
        );

        let folder_id = self.folder_id().await?;
        tracing::debug!(%folder_id, %file_name, size_bytes = bytes.len(), "uploading backup");
        let uploaded = with_deadline(
            self.deadline,
            self.store
                .upload(folder_id, &file_name, bytes, MIME_TYPE, Some(description.as_str())),
        )
        .await
        .map_err(at(PipelineStage::Upload))?;

        Ok(BackupReport {
            file_id: uploaded.id,
            file_name: file_name.clone(),
            web_view_link: uploaded.web_view_link,
            size_mb,
            metadata: BackupMetadata {
                id,
                file_name,
                size_mb,
                created_at,
                encrypted,
                checksum,
            },
            snapshot_tables,
            total_records,
        })
    }

    /// Encrypt on a blocking worker and serialize the envelope
    async fn seal(&self, plain: Vec<u8>) -> Result<Vec<u8>, PipelineFailure> {
        let engine = self.crypto.clone();
        let version = self.envelope_version;
        let envelope = tokio::task::spawn_blocking(move || engine.seal(&plain, version))
            .await
            .map_err(at(PipelineStage::Encrypt))?
            .map_err(at(PipelineStage::Encrypt))?;

        serde_json::to_vec(&envelope).map_err(at(PipelineStage::Serialize))
    }

    /// Folder id for the configured folder name, resolved once
    async fn folder_id(&self) -> Result<&str, PipelineFailure> {
        self.folder_id
            .get_or_try_init(|| {
                with_deadline(self.deadline, self.store.ensure_folder(&self.folder_name))
            })
            .await
            .map(String::as_str)
            .map_err(at(PipelineStage::ResolveFolder))
    }

    /// Backups in the folder, newest first
    pub async fn list_backups(&self) -> Result<Vec<RemoteFile>, PipelineFailure> {
        let folder_id = self.folder_id().await?;
        with_deadline(self.deadline, self.store.list(folder_id))
            .await
            .map_err(at(PipelineStage::List))
    }

    /// The most recent backup, if any
    pub async fn latest_backup(&self) -> Result<Option<RemoteFile>, PipelineFailure> {
        Ok(self.list_backups().await?.into_iter().next())
    }

    pub async fn delete_backup(&self, file_id: &str) -> Result<(), PipelineFailure> {
        with_deadline(self.deadline, self.store.delete(file_id))
            .await
            .map_err(at(PipelineStage::Delete))?;
        tracing::info!(file_id, "backup deleted");
        Ok(())
    }

    /// Delete all but the newest `keep` backups; returns the deleted ones
    pub async fn prune(&self, keep: usize) -> Result<Vec<RemoteFile>, PipelineFailure> {
        let backups = self.list_backups().await?;
        let mut deleted = Vec::new();

        for backup in backups.into_iter().skip(keep) {
            self.delete_backup(&backup.id).await?;
            deleted.push(backup);
        }

        tracing::info!(keep, deleted = deleted.len(), "backups pruned");
        Ok(deleted)
    }
}

/// `backup-<timestamp>-<id prefix>[.encrypted].json`; the id prefix keeps
/// names distinct for runs started within the same millisecond
fn backup_file_name(created_at: DateTime<Utc>, id: Uuid, encrypted: bool) -> String {
    let id = id.simple().to_string();
    format!(
        "backup-{}-{}{}",
        created_at.format("%Y-%m-%dT%H-%M-%S-%3fZ"),
        &id[..8],
        if encrypted { ".encrypted.json" } else { ".json" }
    )
}

/// Size in MB rounded to two decimals
fn round_mb(bytes: usize) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}
