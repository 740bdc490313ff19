//! Filesystem-backed remote store
//!
//! Each folder is a directory under the store root and each object a file in
//! it. Object ids have the form `<folder>/<file>`. A hidden sidecar
//! `.<file>.meta.json` keeps the creation time and description so listings
//! can be ordered precisely. Uploads never replace an existing object.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::traits::{RemoteError, RemoteFile, RemoteResult, RemoteStore, UploadedFile};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    created_at: DateTime<Utc>,
    mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// Local filesystem remote store
#[derive(Debug, Clone)]
pub struct LocalFolderStore {
    root: PathBuf,
}

impl LocalFolderStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub async fn new(root: impl Into<PathBuf>) -> RemoteResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            RemoteError::Io(format!(
                "Failed to create store directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn folder_path(&self, folder_id: &str) -> RemoteResult<PathBuf> {
        validate_component(folder_id)?;
        Ok(self.root.join(folder_id))
    }

    /// Split `<folder>/<file>` and resolve it under the root
    fn object_path(&self, file_id: &str) -> RemoteResult<(PathBuf, PathBuf)> {
        let (folder, file) = file_id
            .split_once('/')
            .ok_or_else(|| RemoteError::InvalidId(file_id.to_string()))?;
        validate_component(file)?;
        let folder_path = self.folder_path(folder)?;
        let sidecar = folder_path.join(sidecar_name(file));
        Ok((folder_path.join(file), sidecar))
    }
}

fn sidecar_name(file: &str) -> String {
    format!(".{}.meta.json", file)
}

/// Reject empty, hidden or path-like components
fn validate_component(component: &str) -> RemoteResult<()> {
    if component.is_empty()
        || component.starts_with('.')
        || component.contains('/')
        || component.contains('\\')
        || component.contains("..")
    {
        return Err(RemoteError::InvalidId(component.to_string()));
    }
    Ok(())
}

async fn write_temp(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

async fn read_sidecar(path: &Path) -> Option<Sidecar> {
    let contents = fs::read(path).await.ok()?;
    serde_json::from_slice(&contents).ok()
}

#[async_trait]
impl RemoteStore for LocalFolderStore {
    async fn ensure_folder(&self, name: &str) -> RemoteResult<String> {
        let path = self.folder_path(name)?;
        fs::create_dir_all(&path).await?;
        Ok(name.to_string())
    }

    async fn upload(
        &self,
        folder_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime_type: &str,
        description: Option<&str>,
    ) -> RemoteResult<UploadedFile> {
        let id = format!("{}/{}", folder_id, file_name);
        let (path, sidecar_path) = self.object_path(&id)?;

        if !fs::try_exists(path.parent().unwrap_or(&self.root)).await? {
            return Err(RemoteError::NotFound(folder_id.to_string()));
        }

        let start = std::time::Instant::now();
        let size = bytes.len();

        // Write to a per-call temp file, then link it into place. The link
        // fails if the name is taken, so an existing backup is never replaced.
        let temp_path =
            path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));
        let written = write_temp(&temp_path, &bytes).await;
        let linked = match written {
            Ok(()) => fs::hard_link(&temp_path, &path).await,
            Err(e) => Err(e),
        };
        let _ = fs::remove_file(&temp_path).await;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(RemoteError::AlreadyExists(id));
            }
            Err(e) => {
                return Err(RemoteError::Io(format!(
                    "Failed to write {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        let sidecar = Sidecar {
            created_at: Utc::now(),
            mime_type: mime_type.to_string(),
            description: description.map(str::to_string),
        };
        let sidecar_json = serde_json::to_vec(&sidecar)
            .map_err(|e| RemoteError::Io(format!("Failed to encode sidecar: {}", e)))?;
        fs::write(&sidecar_path, sidecar_json).await?;

        tracing::info!(
            path = %path.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "local store upload successful"
        );

        Ok(UploadedFile {
            id,
            name: file_name.to_string(),
            web_view_link: Some(format!("file://{}", path.display())),
        })
    }

    async fn list(&self, folder_id: &str) -> RemoteResult<Vec<RemoteFile>> {
        let folder_path = self.folder_path(folder_id)?;
        if !fs::try_exists(&folder_path).await? {
            return Err(RemoteError::NotFound(folder_id.to_string()));
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&folder_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || name.ends_with(".tmp") {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let created_at = match read_sidecar(&folder_path.join(sidecar_name(&name))).await {
                Some(sidecar) => sidecar.created_at,
                None => metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now()),
            };

            files.push(RemoteFile {
                id: format!("{}/{}", folder_id, name),
                name,
                size_bytes: metadata.len(),
                created_at,
            });
        }

        // Newest first
        files.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });

        Ok(files)
    }

    async fn download(&self, file_id: &str) -> RemoteResult<Vec<u8>> {
        let (path, _) = self.object_path(file_id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RemoteError::NotFound(file_id.to_string()))
            }
            Err(e) => Err(RemoteError::Io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, file_id: &str) -> RemoteResult<()> {
        let (path, sidecar_path) = self.object_path(file_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RemoteError::NotFound(file_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        // The sidecar is optional
        let _ = fs::remove_file(&sidecar_path).await;
        tracing::info!(file_id, "local store delete successful");
        Ok(())
    }

    fn destination(&self) -> String {
        format!("local:{}", self.root.display())
    }
}
