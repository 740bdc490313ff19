//! Custom error types for StoreVault
//!
//! This module defines the error hierarchy for the backup subsystem using
//! thiserror for ergonomic error definitions. Component-level errors
//! (`CryptoError`, `RemoteError`) live next to their components and are
//! wrapped here.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::remote::RemoteError;

/// The main error type for StoreVault operations
#[derive(Error, Debug)]
pub enum VaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Downloaded bytes are neither an envelope nor a snapshot
    #[error("Format error: {0}")]
    Format(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Encryption and decryption errors
    #[error("Encryption error: {0}")]
    Crypto(#[from] CryptoError),

    /// A backup envelope could not be opened with the configured key
    #[error(
        "Failed to decrypt backup: {0}. Verify that the configured encryption key \
         matches the one used to create this backup"
    )]
    Decryption(CryptoError),

    /// Remote object store errors
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    /// Data source errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// A blocking worker task failed to complete
    #[error("Worker error: {0}")]
    Worker(String),
}

impl VaultError {
    /// Create a "not found" error for a data table
    pub fn table_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Table",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for a backup
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error, including a missing remote object
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Remote(RemoteError::NotFound(_))
        )
    }

    /// Check if this error came out of the cipher layer
    pub fn is_crypto(&self) -> bool {
        matches!(self, Self::Crypto(_) | Self::Decryption(_))
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<tokio::task::JoinError> for VaultError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}

/// Result type alias for StoreVault operations
pub type VaultResult<T> = Result<T, VaultError>;
