//! Snapshot builder
//!
//! Reads each named table through a `DataSource` and assembles one
//! `SnapshotDocument`. A table that cannot be read is recorded as empty; one
//! bad table never aborts the snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use super::document::{SnapshotDocument, SnapshotMetadata, SNAPSHOT_VERSION};
use super::source::DataSource;

/// Assembles snapshots from a data source
pub struct SnapshotBuilder {
    source: Arc<dyn DataSource>,
    environment: String,
    read_concurrency: usize,
}

impl SnapshotBuilder {
    pub fn new(source: Arc<dyn DataSource>, environment: impl Into<String>) -> Self {
        Self {
            source,
            environment: environment.into(),
            read_concurrency: 1,
        }
    }

    /// Read up to `limit` tables at once; results keep table order
    pub fn with_read_concurrency(mut self, limit: usize) -> Self {
        self.read_concurrency = limit.max(1);
        self
    }

    /// Build a snapshot of `tables`
    pub async fn build(&self, tables: &[String]) -> SnapshotDocument {
        let reads: Vec<_> = stream::iter(tables.iter().map(|name| {
            let source = Arc::clone(&self.source);
            async move { (name, source.read_all(name).await) }
        }))
        .buffered(self.read_concurrency)
        .collect()
        .await;

        let mut data = BTreeMap::new();
        let mut non_empty = Vec::new();
        let mut total_records = 0;

        for (name, result) in reads {
            let records = match result {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(table = %name, error = %e, "table read failed, backing it up as empty");
                    Vec::new()
                }
            };

            total_records += records.len();
            if !records.is_empty() {
                non_empty.push(name.clone());
            }
            data.insert(name.clone(), records);
        }

        tracing::debug!(
            tables = tables.len(),
            non_empty = non_empty.len(),
            total_records,
            "snapshot assembled"
        );

        SnapshotDocument {
            metadata: Some(SnapshotMetadata {
                version: SNAPSHOT_VERSION.to_string(),
                created_at: Utc::now(),
                environment: self.environment.clone(),
                tables: non_empty,
                total_records,
            }),
            data,
        }
    }
}
