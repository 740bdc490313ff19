//! Remote store abstraction trait

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Remote store operation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RemoteError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for remote store operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// An object accepted by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

/// An object listed in a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Folder-scoped blob store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Find or create a folder by display name; repeated calls return the same id
    async fn ensure_folder(&self, name: &str) -> RemoteResult<String>;

    /// Store `bytes` as `file_name` inside a folder; never replaces an existing object
    async fn upload(
        &self,
        folder_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime_type: &str,
        description: Option<&str>,
    ) -> RemoteResult<UploadedFile>;

    /// Objects in a folder, newest first
    async fn list(&self, folder_id: &str) -> RemoteResult<Vec<RemoteFile>>;

    async fn download(&self, file_id: &str) -> RemoteResult<Vec<u8>>;

    async fn delete(&self, file_id: &str) -> RemoteResult<()>;

    /// Short backend label used in notifications
    fn destination(&self) -> String;
}

/// Run a remote call under a deadline
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> RemoteResult<T>
where
    F: Future<Output = RemoteResult<T>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| RemoteError::Timeout(deadline))?
}
