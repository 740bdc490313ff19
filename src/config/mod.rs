//! Configuration module for StoreVault
//!
//! - Platform path resolution with an environment override
//! - `config.json` settings persistence

pub mod paths;
pub mod settings;

pub use paths::VaultPaths;
pub use settings::{RemoteBackend, Settings};
