//! Backup restoration
//!
//! Downloads a stored backup, opens it and validates the snapshot inside.
//! Restoration is validate-only: the parsed snapshot is summarized and
//! checked against the table registry, nothing is written back.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use super::failure::{at, PipelineFailure, PipelineStage};
use super::manager::BackupOrchestrator;
use crate::crypto::{EncryptedEnvelope, EnvelopeVersion};
use crate::error::VaultError;
use crate::remote::with_deadline;
use crate::snapshot::{SnapshotDocument, TableRegistry};

/// Result of validating a stored backup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub file_id: String,
    pub encrypted: bool,
    /// Envelope format, `None` for plaintext backups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope_version: Option<EnvelopeVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub tables_restored: usize,
    pub record_counts: BTreeMap<String, usize>,
    pub total_records: usize,
    /// Schema problems found while validating; never fatal
    pub warnings: Vec<String>,
}

impl RestoreReport {
    fn from_snapshot(
        file_id: &str,
        snapshot: &SnapshotDocument,
        envelope_version: Option<EnvelopeVersion>,
        registry: &TableRegistry,
    ) -> Self {
        let metadata = snapshot.metadata.as_ref();
        Self {
            file_id: file_id.to_string(),
            encrypted: envelope_version.is_some(),
            envelope_version,
            snapshot_version: metadata.map(|m| m.version.clone()),
            created_at: metadata.map(|m| m.created_at),
            environment: metadata.map(|m| m.environment.clone()),
            tables_restored: snapshot.tables_restored(),
            record_counts: snapshot.record_counts(),
            total_records: snapshot.total_records(),
            warnings: schema_warnings(snapshot, registry),
        }
    }

    /// Whether validation found no schema problems
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let format = match self.envelope_version {
            Some(version) => format!("encrypted, envelope v{}", u8::from(version)),
            None => "plaintext".to_string(),
        };
        format!(
            "Validated {} table(s), {} record(s) ({})",
            self.tables_restored, self.total_records, format
        )
    }
}

/// Compare a snapshot against the registry
fn schema_warnings(snapshot: &SnapshotDocument, registry: &TableRegistry) -> Vec<String> {
    let mut warnings = Vec::new();

    for (table, records) in &snapshot.data {
        let Some(spec) = registry.get(table) else {
            warnings.push(format!("table '{}' is not in the table registry", table));
            continue;
        };

        let mut missing = BTreeSet::new();
        let mut affected = 0;
        for record in records {
            let fields = spec.missing_fields(record);
            if !fields.is_empty() {
                affected += 1;
                missing.extend(fields);
            }
        }
        if affected > 0 {
            warnings.push(format!(
                "{}: {} record(s) missing required field(s) {}",
                table,
                affected,
                missing.into_iter().collect::<Vec<_>>().join(", ")
            ));
        }
    }

    if let Some(metadata) = &snapshot.metadata {
        let actual = snapshot.total_records();
        if metadata.total_records != actual {
            warnings.push(format!(
                "metadata reports {} records but the snapshot holds {}",
                metadata.total_records, actual
            ));
        }
    }

    warnings
}

impl BackupOrchestrator {
    /// Download, open and validate a backup
    pub async fn restore(&self, file_id: &str) -> Result<RestoreReport, PipelineFailure> {
        let result = AssertUnwindSafe(self.run_restore(file_id))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(PipelineFailure::from_panic(panic)));

        match &result {
            Ok(report) => tracing::info!(
                file_id,
                encrypted = report.encrypted,
                tables = report.tables_restored,
                total_records = report.total_records,
                warnings = report.warnings.len(),
                "backup validated"
            ),
            Err(failure) => tracing::error!(
                file_id,
                stage = %failure.stage,
                error = %failure.error,
                "restore failed"
            ),
        }

        result
    }

    async fn run_restore(&self, file_id: &str) -> Result<RestoreReport, PipelineFailure> {
        let bytes = with_deadline(self.deadline, self.store.download(file_id))
            .await
            .map_err(at(PipelineStage::Download))?;

        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            PipelineFailure::new(
                PipelineStage::Parse,
                VaultError::Format(format!("Backup {} is not valid JSON: {}", file_id, e)),
            )
        })?;

        let (snapshot, envelope_version) = if EncryptedEnvelope::matches_shape(&value) {
            let envelope = EncryptedEnvelope::from_value(value).map_err(decryption_failure)?;
            let version = envelope.format_version().map_err(decryption_failure)?;

            let engine = self.crypto.clone();
            let plain = tokio::task::spawn_blocking(move || engine.open(&envelope))
                .await
                .map_err(at(PipelineStage::Decrypt))?
                .map_err(decryption_failure)?;

            let snapshot =
                SnapshotDocument::from_json_bytes(&plain).map_err(at(PipelineStage::Parse))?;
            (snapshot, Some(version))
        } else {
            tracing::debug!(file_id, "no envelope found, reading legacy plaintext backup");
            let snapshot = SnapshotDocument::from_value(value).map_err(at(PipelineStage::Parse))?;
            (snapshot, None)
        };

        Ok(RestoreReport::from_snapshot(
            file_id,
            &snapshot,
            envelope_version,
            &self.registry,
        ))
    }
}

fn decryption_failure(error: crate::crypto::CryptoError) -> PipelineFailure {
    PipelineFailure::new(PipelineStage::Decrypt, VaultError::Decryption(error))
}
