//! Backup pipelines for StoreVault
//!
//! # Architecture
//!
//! `BackupOrchestrator` ties the other components together:
//!
//! - creation: `SnapshotBuilder` -> JSON -> `CryptoEngine` -> `RemoteStore`
//! - restore: `RemoteStore` -> envelope detection -> `CryptoEngine` -> snapshot
//!
//! Encryption and decryption run on tokio's blocking pool. The remote folder
//! id is resolved once per orchestrator and every remote call runs under the
//! configured deadline.
//!
//! # Backup Format
//!
//! Objects are named `backup-<UTC timestamp>.encrypted.json` when encrypted and
//! `backup-<UTC timestamp>.json` otherwise. Encrypted objects hold an
//! `EncryptedEnvelope`; plaintext objects hold the `SnapshotDocument` itself.
//! Restore accepts both, including version 1 envelopes.
//!
//! # Example
//!
//! ```rust,ignore
//! use storevault::backup::{BackupOptions, BackupOrchestrator};
//!
//! let orchestrator = BackupOrchestrator::new(&settings, source, crypto, store, notifier)?;
//! let report = orchestrator.create_backup(BackupOptions::default()).await?;
//!
//! // Later, check that it opens
//! let restored = orchestrator.restore(&report.file_id).await?;
//! println!("{}", restored.summary());
//! ```

mod failure;
mod manager;
mod restore;
#[cfg(test)]
mod testing;

pub use failure::{PipelineFailure, PipelineStage};
pub use manager::{BackupMetadata, BackupOptions, BackupOrchestrator, BackupReport};
pub use restore::RestoreReport;
