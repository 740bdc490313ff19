//! Drive-style REST remote store
//!
//! Talks to a Drive v3 compatible API:
//!
//! - folders are files with the folder MIME type, found by name query
//! - uploads create the file metadata first, then send the media body; a
//!   file whose media body never lands is deleted again
//! - listings are ordered by `createdTime desc` server-side
//!
//! Base URLs are configurable so the adapter can point at a proxy or a test
//! server.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use super::token::{TokenCache, TokenSource};
use super::traits::{RemoteError, RemoteFile, RemoteResult, RemoteStore, UploadedFile};
use crate::config::settings::DriveSettings;

const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    /// Drive reports sizes as decimal strings
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    web_view_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Remote store backed by a Drive v3 compatible API
pub struct DriveStore {
    client: Client,
    api_base: String,
    upload_base: String,
    token: Mutex<Option<TokenCache>>,
    source: Arc<dyn TokenSource>,
}

impl DriveStore {
    /// Create a store; `initial` seeds the token cache
    pub fn new(
        settings: &DriveSettings,
        initial: Option<TokenCache>,
        source: Arc<dyn TokenSource>,
    ) -> RemoteResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("storevault/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            upload_base: settings.upload_base.trim_end_matches('/').to_string(),
            token: Mutex::new(initial),
            source,
        })
    }

    /// Current bearer token, refreshed through the source when stale
    async fn bearer(&self) -> RemoteResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh_at(Utc::now())) {
            return Ok(token.token().to_string());
        }

        tracing::debug!("refreshing remote store access token");
        let fresh = self.source.fetch().await?;
        let token = fresh.token().to_string();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Map non-success statuses onto `RemoteError`
    async fn check(&self, response: Response, what: &str) -> RemoteResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                // Force a refresh on the next call
                self.token.lock().await.take();
                Err(RemoteError::Unauthorized(format!("{}: {}", what, status)))
            }
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound(what.to_string())),
            _ => Err(RemoteError::Transport(format!(
                "{} returned {}: {}",
                what,
                status,
                body.trim()
            ))),
        }
    }

    async fn send_media(
        &self,
        file_id: &str,
        bytes: Vec<u8>,
        mime_type: &str,
    ) -> RemoteResult<()> {
        let response = self
            .client
            .patch(format!("{}/files/{}", self.upload_base, file_id))
            .bearer_auth(self.bearer().await?)
            .query(&[("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;
        self.check(response, "media upload").await?;
        Ok(())
    }

    async fn find_folder(&self, name: &str) -> RemoteResult<Option<String>> {
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escape_query(name),
            FOLDER_MIME_TYPE
        );

        let response = self
            .client
            .get(format!("{}/files", self.api_base))
            .bearer_auth(self.bearer().await?)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .send()
            .await?;
        let list: DriveFileList = self.check(response, "folder lookup").await?.json().await?;

        Ok(list.files.into_iter().next().map(|f| f.id))
    }
}

/// A created file whose media upload has not completed
///
/// Dropping it while armed, for example when the upload future is cancelled
/// by a deadline, deletes the file in a background task.
struct PendingFile {
    client: Client,
    url: String,
    token: String,
    armed: bool,
}

impl PendingFile {
    fn disarm(mut self) {
        self.armed = false;
    }

    async fn discard(mut self) {
        self.armed = false;
        remove_orphan(self.client.clone(), self.url.clone(), self.token.clone()).await;
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(remove_orphan(
                self.client.clone(),
                std::mem::take(&mut self.url),
                std::mem::take(&mut self.token),
            ));
        }
    }
}

async fn remove_orphan(client: Client, url: String, token: String) {
    match client.delete(&url).bearer_auth(&token).send().await {
        Ok(response) if response.status().is_success() => {
            tracing::warn!(%url, "removed partially uploaded file");
        }
        Ok(response) => {
            tracing::warn!(
                %url,
                status = %response.status(),
                "could not remove partially uploaded file"
            );
        }
        Err(e) => {
            tracing::warn!(%url, error = %e, "could not remove partially uploaded file");
        }
    }
}

/// Escape a value for a single-quoted Drive query literal
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Drive ids are URL-safe; anything else is rejected before it hits a URL
fn validate_id(id: &str) -> RemoteResult<()> {
    if id.is_empty()
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(RemoteError::InvalidId(id.to_string()));
    }
    Ok(())
}

#[async_trait]
impl RemoteStore for DriveStore {
    async fn ensure_folder(&self, name: &str) -> RemoteResult<String> {
        if let Some(id) = self.find_folder(name).await? {
            return Ok(id);
        }

        let response = self
            .client
            .post(format!("{}/files", self.api_base))
            .bearer_auth(self.bearer().await?)
            .query(&[("fields", "id")])
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME_TYPE }))
            .send()
            .await?;
        let folder: DriveFile = self.check(response, "folder create").await?.json().await?;

        tracing::info!(folder = name, folder_id = %folder.id, "created remote backup folder");
        Ok(folder.id)
    }

    async fn upload(
        &self,
        folder_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime_type: &str,
        description: Option<&str>,
    ) -> RemoteResult<UploadedFile> {
        validate_id(folder_id)?;
        let start = std::time::Instant::now();
        let size = bytes.len();

        let mut metadata = json!({
            "name": file_name,
            "parents": [folder_id],
            "mimeType": mime_type,
        });
        if let Some(description) = description {
            metadata["description"] = json!(description);
        }

        let token = self.bearer().await?;
        let response = self
            .client
            .post(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[("fields", "id,name,webViewLink")])
            .json(&metadata)
            .send()
            .await?;
        let created: DriveFile = self.check(response, "file create").await?.json().await?;
        validate_id(&created.id)?;

        // The file exists without content until the media upload lands
        let pending = PendingFile {
            client: self.client.clone(),
            url: format!("{}/files/{}", self.api_base, created.id),
            token,
            armed: true,
        };
        if let Err(e) = self.send_media(&created.id, bytes, mime_type).await {
            pending.discard().await;
            return Err(e);
        }
        pending.disarm();

        tracing::info!(
            file_id = %created.id,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "drive upload successful"
        );

        Ok(UploadedFile {
            id: created.id,
            name: if created.name.is_empty() {
                file_name.to_string()
            } else {
                created.name
            },
            web_view_link: created.web_view_link,
        })
    }

    async fn list(&self, folder_id: &str) -> RemoteResult<Vec<RemoteFile>> {
        validate_id(folder_id)?;
        let query = format!("'{}' in parents and trashed = false", folder_id);

        let response = self
            .client
            .get(format!("{}/files", self.api_base))
            .bearer_auth(self.bearer().await?)
            .query(&[
                ("q", query.as_str()),
                ("orderBy", "createdTime desc"),
                ("fields", "files(id,name,size,createdTime)"),
                ("pageSize", "1000"),
            ])
            .send()
            .await?;
        let list: DriveFileList = self.check(response, "file list").await?.json().await?;

        list.files
            .into_iter()
            .map(|file| {
                let size_bytes = match file.size.as_deref() {
                    Some(size) => size.parse().map_err(|_| {
                        RemoteError::Transport(format!("invalid size '{}' for {}", size, file.id))
                    })?,
                    None => 0,
                };
                Ok(RemoteFile {
                    created_at: file.created_time.unwrap_or_else(Utc::now),
                    id: file.id,
                    name: file.name,
                    size_bytes,
                })
            })
            .collect()
    }

    async fn download(&self, file_id: &str) -> RemoteResult<Vec<u8>> {
        validate_id(file_id)?;
        let response = self
            .client
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(self.bearer().await?)
            .query(&[("alt", "media")])
            .send()
            .await?;
        let bytes = self.check(response, file_id).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, file_id: &str) -> RemoteResult<()> {
        validate_id(file_id)?;
        let response = self
            .client
            .delete(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        self.check(response, file_id).await?;
        tracing::info!(file_id, "drive delete successful");
        Ok(())
    }

    fn destination(&self) -> String {
        "drive".to_string()
    }
}
