//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup orchestrator.

pub mod backup;
pub mod context;
pub mod setup;

pub use backup::{handle_backup_command, BackupCommands};
pub use context::CliContext;
pub use setup::{handle_init, handle_status};
