//! Wiring shared by CLI commands
//!
//! Builds the orchestrator and its collaborators from settings and the
//! secrets passed on the command line or through the environment.

use std::sync::Arc;
use std::time::Duration;

use crate::backup::BackupOrchestrator;
use crate::config::{RemoteBackend, Settings, VaultPaths};
use crate::crypto::{CryptoEngine, SecretString};
use crate::error::VaultResult;
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::remote::{DriveStore, LocalFolderStore, RemoteStore, StaticTokenSource};
use crate::snapshot::JsonDirSource;

/// Paths, settings and secrets for one CLI invocation
pub struct CliContext {
    pub paths: VaultPaths,
    pub settings: Settings,
    backup_key: Option<SecretString>,
    drive_token: Option<SecretString>,
}

impl CliContext {
    pub fn new(
        paths: VaultPaths,
        settings: Settings,
        backup_key: Option<String>,
        drive_token: Option<String>,
    ) -> Self {
        Self {
            paths,
            settings,
            backup_key: backup_key.map(SecretString::from),
            drive_token: drive_token.map(SecretString::from),
        }
    }

    /// Cipher configured from the backup key, if any
    ///
    /// Key derivation runs on a blocking worker.
    pub async fn crypto(&self) -> VaultResult<CryptoEngine> {
        let secret = self.backup_key.clone();
        let params = self.settings.kdf;
        let engine = tokio::task::spawn_blocking(move || {
            CryptoEngine::configure(secret.as_ref().map(|k| k.as_str()), params)
        })
        .await?;
        Ok(engine)
    }

    /// Remote store for the configured backend
    pub async fn store(&self) -> VaultResult<Arc<dyn RemoteStore>> {
        let store: Arc<dyn RemoteStore> = match self.settings.remote.backend {
            RemoteBackend::Local => Arc::new(LocalFolderStore::new(self.paths.remote_dir()).await?),
            RemoteBackend::Drive => {
                let token = self.drive_token.as_ref().map(|t| t.as_str().to_string());
                Arc::new(DriveStore::new(
                    &self.settings.remote.drive,
                    None,
                    Arc::new(StaticTokenSource::new(token)),
                )?)
            }
        };
        Ok(store)
    }

    pub fn notifier(&self) -> VaultResult<Arc<dyn Notifier>> {
        match &self.settings.notifications.webhook_url {
            Some(url) => Ok(Arc::new(WebhookNotifier::new(
                url.clone(),
                Duration::from_secs(self.settings.remote.timeout_secs),
            )?)),
            None => Ok(Arc::new(LogNotifier)),
        }
    }

    /// Fully wired orchestrator over the local data directory
    pub async fn orchestrator(&self) -> VaultResult<BackupOrchestrator> {
        BackupOrchestrator::new(
            &self.settings,
            Arc::new(JsonDirSource::new(self.paths.data_dir())),
            self.crypto().await?,
            self.store().await?,
            self.notifier()?,
        )
    }
}
