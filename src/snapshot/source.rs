//! Read-only data sources for snapshot assembly

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{VaultError, VaultResult};

/// Read access to named record collections
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Every record of `table`, in the source's natural order
    ///
    /// A missing table is reported as `VaultError::NotFound`.
    async fn read_all(&self, table: &str) -> VaultResult<Vec<Value>>;
}

/// Tables stored as `<dir>/<table>.json`, each a JSON array of records
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    dir: PathBuf,
}

impl JsonDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.json", table))
    }
}

#[async_trait]
impl DataSource for JsonDirSource {
    async fn read_all(&self, table: &str) -> VaultResult<Vec<Value>> {
        let path = self.table_path(table);

        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::table_not_found(table));
            }
            Err(e) => {
                return Err(VaultError::Storage(format!(
                    "Failed to open {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_slice(&contents).map_err(|e| {
            VaultError::Storage(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_records_in_file_order() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("orders.json"),
            r#"[{"id": 3}, {"id": 1}, {"id": 2}]"#,
        )
        .unwrap();

        let source = JsonDirSource::new(temp.path());
        let records = source.read_all("orders").await.unwrap();
        assert_eq!(records, vec![json!({"id": 3}), json!({"id": 1}), json!({"id": 2})]);
    }

    #[tokio::test]
    async fn test_missing_table_is_not_found() {
        let temp = TempDir::new().unwrap();
        let source = JsonDirSource::new(temp.path());

        let err = source.read_all("customers").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_non_array_is_storage_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("campaigns.json"), r#"{"id": 1}"#).unwrap();

        let source = JsonDirSource::new(temp.path());
        let err = source.read_all("campaigns").await.unwrap_err();
        assert!(matches!(err, VaultError::Storage(_)));
    }
}
