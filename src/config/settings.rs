//! Settings for StoreVault
//!
//! Persisted as `config.json` in the base directory. Every field has a serde
//! default so older or hand-written config files keep loading. The encryption
//! secret is deliberately not part of this file; it comes from the
//! environment.

use serde::{Deserialize, Serialize};

use super::paths::VaultPaths;
use crate::crypto::{EnvelopeVersion, KeyDerivationParams};
use crate::error::VaultError;
use crate::snapshot::{TableRegistry, TableSpec};

/// Backup pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    /// Display name of the remote folder holding backups
    pub folder_name: String,
    /// Encrypt new backups when a key is configured
    pub encrypt: bool,
    /// Embed the snapshot metadata block
    pub include_metadata: bool,
    /// Maximum number of tables read at once
    pub read_concurrency: usize,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            folder_name: "StoreVault Backups".to_string(),
            encrypt: true,
            include_metadata: true,
            read_concurrency: 4,
        }
    }
}

/// Which remote store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackend {
    /// Folders under `<base>/remote`
    #[default]
    Local,
    /// Drive-style REST API
    Drive,
}

/// Endpoints for the Drive backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveSettings {
    pub api_base: String,
    pub upload_base: String,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
        }
    }
}

/// Remote store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub backend: RemoteBackend,
    /// Deadline applied to every remote call
    pub timeout_secs: u64,
    pub drive: DriveSettings,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            backend: RemoteBackend::default(),
            timeout_secs: 60,
            drive: DriveSettings::default(),
        }
    }
}

/// Notification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotificationSettings {
    /// POST target for success/failure events; log-only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// StoreVault settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Environment label written into snapshot metadata
    pub environment: String,

    pub backup: BackupSettings,

    /// Envelope format for new encrypted backups
    pub envelope_version: EnvelopeVersion,

    /// Argon2 cost parameters
    pub kdf: KeyDerivationParams,

    pub remote: RemoteSettings,

    pub notifications: NotificationSettings,

    /// Tables included in every snapshot, in order
    pub tables: Vec<TableSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: 1,
            environment: "production".to_string(),
            backup: BackupSettings::default(),
            envelope_version: EnvelopeVersion::default(),
            kdf: KeyDerivationParams::default(),
            remote: RemoteSettings::default(),
            notifications: NotificationSettings::default(),
            tables: TableRegistry::retail_default().into_specs(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or default settings if the file doesn't exist
    pub fn load_or_create(paths: &VaultPaths) -> Result<Self, VaultError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            // Don't save yet - let caller decide when to persist
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| VaultError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| VaultError::Config(format!("Failed to parse settings file: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &VaultPaths) -> Result<(), VaultError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| VaultError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| VaultError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.backup.folder_name.trim().is_empty() {
            return Err(VaultError::Config("backup.folder_name must not be empty".into()));
        }
        if self.backup.read_concurrency == 0 {
            return Err(VaultError::Config("backup.read_concurrency must be at least 1".into()));
        }
        if self.remote.timeout_secs == 0 {
            return Err(VaultError::Config("remote.timeout_secs must be at least 1".into()));
        }
        self.table_registry().map(|_| ())
    }

    /// Registry built from the configured table list
    pub fn table_registry(&self) -> Result<TableRegistry, VaultError> {
        TableRegistry::new(self.tables.clone())
    }
}
