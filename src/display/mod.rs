//! Display formatting for terminal output
//!
//! Plain-text tables and detail views for backups and validation reports.

pub mod backup;

pub use backup::{
    format_backup_details, format_backup_list, format_backup_report, format_engine_status,
    format_restore_report,
};
