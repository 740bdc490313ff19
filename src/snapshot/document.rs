//! Snapshot document model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{VaultError, VaultResult};

/// Format version written into new snapshot metadata
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Descriptive block at the top of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub environment: String,
    /// Tables with at least one record
    pub tables: Vec<String>,
    /// Records across every table, empty ones included
    pub total_records: usize,
}

/// A point-in-time copy of every backed-up table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub metadata: Option<SnapshotMetadata>,
    pub data: BTreeMap<String, Vec<Value>>,
}

impl SnapshotDocument {
    /// Drop the metadata block
    pub fn without_metadata(mut self) -> Self {
        self.metadata = None;
        self
    }

    /// Record count per table
    pub fn record_counts(&self) -> BTreeMap<String, usize> {
        self.data
            .iter()
            .map(|(name, records)| (name.clone(), records.len()))
            .collect()
    }

    /// Sum of all record counts
    pub fn total_records(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    /// Number of tables a restore would touch
    ///
    /// Uses `metadata.tables` when present, otherwise counts non-empty tables.
    pub fn tables_restored(&self) -> usize {
        match &self.metadata {
            Some(metadata) => metadata.tables.len(),
            None => self.data.values().filter(|r| !r.is_empty()).count(),
        }
    }

    /// Serialize to the JSON bytes uploaded to the remote store
    pub fn to_json_bytes(&self) -> VaultResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| VaultError::Json(format!("Failed to serialize snapshot: {}", e)))
    }

    /// Interpret an already-parsed JSON document as a snapshot
    pub fn from_value(value: Value) -> VaultResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| VaultError::Format(format!("Not a snapshot document: {}", e)))
    }

    /// Parse snapshot bytes
    pub fn from_json_bytes(bytes: &[u8]) -> VaultResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| VaultError::Format(format!("Not a snapshot document: {}", e)))
    }
}
