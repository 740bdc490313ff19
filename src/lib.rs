//! StoreVault - Encrypted backup and restore for retail back-office data
//!
//! This library snapshots a fixed set of tables, encrypts the snapshot with
//! AES-256-GCM under an Argon2id-derived key and stores it in a remote folder.
//! Stored backups can be downloaded, opened and validated again, including
//! plaintext backups from before encryption was enabled.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `crypto`: Cipher, key derivation, envelope format and checksums
//! - `snapshot`: Table registry, data sources and snapshot assembly
//! - `remote`: Remote store trait with local and Drive backends
//! - `notify`: Success and failure notifications
//! - `backup`: The backup and restore pipelines
//! - `display`: Terminal formatting
//! - `cli`: Command handlers for the `storevault` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use storevault::config::{Settings, VaultPaths};
//!
//! let paths = VaultPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod display;
pub mod error;
pub mod notify;
pub mod remote;
pub mod snapshot;

pub use error::VaultError;
