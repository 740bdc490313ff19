//! Backup display formatting
//!
//! Formats stored backups and validation reports for terminal output.

use chrono::{DateTime, Duration, Utc};

use crate::backup::{BackupReport, RestoreReport};
use crate::crypto::EngineStatus;
use crate::remote::RemoteFile;

/// Format stored backups as a table, newest first
pub fn format_backup_list(backups: &[RemoteFile], now: DateTime<Utc>) -> String {
    if backups.is_empty() {
        return "No backups found.\nCreate one with: storevault backup create".to_string();
    }

    let name_width = backups
        .iter()
        .map(|b| b.name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:>3}  {:<name_width$}  {:>10}  {:>6}  {}\n",
        "#",
        "Name",
        "Size",
        "Age",
        "Type",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:->3}  {:-<name_width$}  {:->10}  {:->6}  {:-<9}\n",
        "",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for (i, backup) in backups.iter().enumerate() {
        output.push_str(&format!(
            "{:>3}  {:<name_width$}  {:>10}  {:>6}  {}\n",
            i + 1,
            backup.name,
            format_size(backup.size_bytes),
            format_duration(now.signed_duration_since(backup.created_at)),
            backup_kind(&backup.name),
            name_width = name_width,
        ));
    }

    output.push_str(&format!("\nTotal: {} backup(s)", backups.len()));
    output
}

/// Format one stored backup with its id and exact timestamp
pub fn format_backup_details(backup: &RemoteFile) -> String {
    format!(
        "{}\n   ID:      {}\n   Created: {}\n   Size:    {}\n   Type:    {}",
        backup.name,
        backup.id,
        backup.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        format_size(backup.size_bytes),
        backup_kind(&backup.name),
    )
}

/// Format the result of `create_backup`
pub fn format_backup_report(report: &BackupReport) -> String {
    let mut output = String::new();
    output.push_str("Backup Created\n");
    output.push_str("==============\n");
    output.push_str(&format!("File:      {}\n", report.file_name));
    output.push_str(&format!("ID:        {}\n", report.file_id));
    if let Some(link) = &report.web_view_link {
        output.push_str(&format!("Link:      {}\n", link));
    }
    output.push_str(&format!("Size:      {:.2} MB\n", report.size_mb));
    output.push_str(&format!(
        "Encrypted: {}\n",
        if report.metadata.encrypted { "Yes" } else { "No" }
    ));
    output.push_str(&format!(
        "Contents:  {} record(s) in {} non-empty table(s)\n",
        report.total_records, report.snapshot_tables
    ));
    output.push_str(&format!("Checksum:  {}", report.metadata.checksum));
    output
}

/// Format a validation report with per-table counts
pub fn format_restore_report(report: &RestoreReport) -> String {
    let mut output = String::new();
    output.push_str("Backup Details\n");
    output.push_str("==============\n");
    output.push_str(&format!("ID:        {}\n", report.file_id));
    match report.envelope_version {
        Some(version) => output.push_str(&format!(
            "Encrypted: Yes (envelope v{})\n",
            u8::from(version)
        )),
        None => output.push_str("Encrypted: No\n"),
    }
    if let Some(created_at) = report.created_at {
        output.push_str(&format!(
            "Created:   {}\n",
            created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    if let Some(environment) = &report.environment {
        output.push_str(&format!("Env:       {}\n", environment));
    }
    if let Some(version) = &report.snapshot_version {
        output.push_str(&format!("Format:    {}\n", version));
    }

    output.push_str("\nContents:\n");
    let table_width = report
        .record_counts
        .keys()
        .map(String::len)
        .max()
        .unwrap_or(5)
        .max(5);
    for (table, count) in &report.record_counts {
        output.push_str(&format!(
            "  {:<table_width$}  {:>8}\n",
            table,
            count,
            table_width = table_width,
        ));
    }
    output.push_str(&format!(
        "  {:<table_width$}  {:>8}\n",
        "Total",
        report.total_records,
        table_width = table_width,
    ));

    if !report.warnings.is_empty() {
        output.push_str("\nWarnings:\n");
        for warning in &report.warnings {
            output.push_str(&format!("  - {}\n", warning));
        }
    }

    output.push('\n');
    output.push_str(&report.summary());
    output
}

/// Format the cipher status line
pub fn format_engine_status(status: &EngineStatus) -> String {
    match (status.configured, &status.reason) {
        (true, _) => format!("enabled ({})", status.algorithm),
        (false, Some(reason)) => format!("disabled ({})", reason),
        (false, None) => "disabled".to_string(),
    }
}

fn backup_kind(name: &str) -> &'static str {
    if name.ends_with(".encrypted.json") {
        "encrypted"
    } else {
        "plaintext"
    }
}

/// Format a duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
