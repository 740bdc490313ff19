//! Init and status commands

use anyhow::{Context, Result};

use super::context::CliContext;
use crate::config::RemoteBackend;
use crate::display::format_engine_status;

/// Create the directory layout and write default settings
pub fn handle_init(ctx: &CliContext) -> Result<()> {
    println!("Initializing StoreVault at: {}", ctx.paths.base_dir().display());

    ctx.paths.ensure_directories()?;
    if ctx.paths.is_initialized() {
        println!("Settings already exist, leaving them unchanged.");
    } else {
        ctx.settings
            .save(&ctx.paths)
            .context("Failed to write default settings")?;
    }

    println!("Initialization complete!");
    println!();
    println!("Place table exports as <table>.json in:");
    println!("  {}", ctx.paths.data_dir().display());
    println!();
    println!("Tables backed up:");
    for spec in &ctx.settings.tables {
        println!("  - {}", spec.name);
    }
    println!();
    println!("Run 'storevault backup create' to take the first backup.");
    Ok(())
}

/// Show paths, backend and encryption state
pub async fn handle_status(ctx: &CliContext) -> Result<()> {
    let crypto = ctx.crypto().await?;
    let backend = match ctx.settings.remote.backend {
        RemoteBackend::Local => format!("local ({})", ctx.paths.remote_dir().display()),
        RemoteBackend::Drive => format!("drive ({})", ctx.settings.remote.drive.api_base),
    };

    println!("StoreVault Status");
    println!("=================");
    println!("Base directory:  {}", ctx.paths.base_dir().display());
    println!("Data directory:  {}", ctx.paths.data_dir().display());
    println!(
        "Initialized:     {}",
        if ctx.paths.is_initialized() { "Yes" } else { "No" }
    );
    println!();
    println!("Settings:");
    println!("  Environment:   {}", ctx.settings.environment);
    println!("  Remote store:  {}", backend);
    println!("  Folder:        {}", ctx.settings.backup.folder_name);
    println!("  Encryption:    {}", format_engine_status(&crypto.status()));
    println!(
        "  Envelope:      v{}",
        u8::from(ctx.settings.envelope_version)
    );
    println!("  Tables:        {}", ctx.settings.tables.len());
    println!(
        "  Notifications: {}",
        ctx.settings
            .notifications
            .webhook_url
            .as_deref()
            .unwrap_or("log only")
    );
    Ok(())
}
