use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use storevault::cli::{handle_backup_command, handle_init, handle_status, BackupCommands, CliContext};
use storevault::config::{Settings, VaultPaths};

#[derive(Parser)]
#[command(
    name = "storevault",
    version,
    about = "Encrypted snapshot backups for retail back-office data",
    long_about = "StoreVault snapshots the retail back-office tables, encrypts the \
                  snapshot with AES-256-GCM and stores it in a remote folder. Stored \
                  backups can be listed, validated and pruned from the command line."
)]
struct Cli {
    /// Backup encryption secret (at least 32 characters)
    #[arg(long, global = true, env = "STOREVAULT_BACKUP_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Access token for the drive backend
    #[arg(long, global = true, env = "STOREVAULT_DRIVE_TOKEN", hide_env_values = true)]
    drive_token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directories and default settings
    Init,

    /// Show configuration, paths and encryption state
    Status,

    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storevault=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = VaultPaths::new().context("Failed to resolve StoreVault directories")?;
    let settings = Settings::load_or_create(&paths).context("Failed to load settings")?;
    let ctx = CliContext::new(paths, settings, cli.key, cli.drive_token);

    match cli.command {
        Some(Commands::Init) => handle_init(&ctx)?,
        Some(Commands::Status) => handle_status(&ctx).await?,
        Some(Commands::Backup(cmd)) => handle_backup_command(&ctx, cmd).await?,
        None => {
            println!("StoreVault - Encrypted backups for retail back-office data");
            println!();
            println!("Run 'storevault --help' for usage information.");
            println!("Run 'storevault init' to get started.");
        }
    }

    Ok(())
}
