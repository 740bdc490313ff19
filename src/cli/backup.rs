//! Backup CLI commands
//!
//! Implements CLI commands for creating, listing, validating and deleting
//! stored backups.

use anyhow::Result;
use clap::Subcommand;

use super::context::CliContext;
use crate::backup::{BackupOptions, BackupOrchestrator};
use crate::display::{
    format_backup_details, format_backup_list, format_backup_report, format_restore_report,
};
use crate::error::VaultError;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup and upload it
    Create {
        /// Upload plaintext even when a key is configured
        #[arg(long)]
        no_encrypt: bool,

        /// Leave out the snapshot metadata block
        #[arg(long)]
        no_metadata: bool,
    },

    /// List stored backups, newest first
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Download a backup, open it and validate its contents
    #[command(alias = "restore")]
    Inspect {
        /// Backup id or file name (use 'latest' for most recent)
        backup: String,
    },

    /// Delete a stored backup
    Delete {
        /// Backup id or file name
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete all but the newest backups
    Prune {
        /// Number of backups to keep
        #[arg(short, long, default_value_t = 10)]
        keep: usize,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Handle a backup command
pub async fn handle_backup_command(ctx: &CliContext, cmd: BackupCommands) -> Result<()> {
    let orchestrator = ctx.orchestrator().await?;

    match cmd {
        BackupCommands::Create {
            no_encrypt,
            no_metadata,
        } => {
            let defaults = orchestrator.default_options();
            let options = BackupOptions {
                encrypt: defaults.encrypt && !no_encrypt,
                include_metadata: defaults.include_metadata && !no_metadata,
            };

            println!("Creating backup...");
            let report = orchestrator.create_backup(options).await?;
            println!("{}", format_backup_report(&report));
        }

        BackupCommands::List { verbose } => {
            let backups = orchestrator.list_backups().await?;

            if verbose && !backups.is_empty() {
                println!("Available Backups");
                println!("=================");
                println!();
                for (i, backup) in backups.iter().enumerate() {
                    println!("{}. {}\n", i + 1, format_backup_details(backup));
                }
                println!("Total: {} backup(s)", backups.len());
            } else {
                println!("{}", format_backup_list(&backups, chrono::Utc::now()));
            }
        }

        BackupCommands::Inspect { backup } => {
            let file_id = resolve_backup_id(&orchestrator, &backup).await?;
            let report = orchestrator.restore(&file_id).await?;
            println!("{}", format_restore_report(&report));
        }

        BackupCommands::Delete { backup, force } => {
            let file_id = resolve_backup_id(&orchestrator, &backup).await?;

            if !force {
                println!("WARNING: This will permanently delete {}", file_id);
                println!("To proceed, run again with --force flag:");
                println!("  storevault backup delete {} --force", backup);
                return Ok(());
            }

            orchestrator.delete_backup(&file_id).await?;
            println!("Deleted backup: {}", file_id);
        }

        BackupCommands::Prune { keep, force } => {
            let backups = orchestrator.list_backups().await?;
            let to_delete = backups.len().saturating_sub(keep);

            if to_delete == 0 {
                println!("No backups to prune.");
                println!("You have {} backup(s); keeping up to {}.", backups.len(), keep);
                return Ok(());
            }

            println!("Prune Summary");
            println!("=============");
            println!("Current backups: {}", backups.len());
            println!("To keep:         {}", keep);
            println!("To be deleted:   {}", to_delete);
            println!();

            if !force {
                println!("To delete old backups, run again with --force flag:");
                println!("  storevault backup prune --keep {} --force", keep);
                return Ok(());
            }

            let deleted = orchestrator.prune(keep).await?;
            println!("Deleted {} backup(s).", deleted.len());
        }
    }

    Ok(())
}

/// Resolve 'latest', a file name or an id to a backup id
async fn resolve_backup_id(orchestrator: &BackupOrchestrator, backup: &str) -> Result<String> {
    if backup.eq_ignore_ascii_case("latest") {
        return orchestrator
            .latest_backup()
            .await?
            .map(|b| b.id)
            .ok_or_else(|| VaultError::backup_not_found("latest").into());
    }

    let backups = orchestrator.list_backups().await?;
    Ok(backups
        .into_iter()
        .find(|b| b.id == backup || b.name == backup)
        .map(|b| b.id)
        .unwrap_or_else(|| backup.to_string()))
}
