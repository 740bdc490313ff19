//! Snapshot assembly
//!
//! A snapshot is one JSON document holding every backed-up table:
//!
//! ```json
//! {
//!   "metadata": {
//!     "version": "1.0",
//!     "createdAt": "2026-10-15T08:00:00Z",
//!     "environment": "production",
//!     "tables": ["customers"],
//!     "totalRecords": 3
//!   },
//!   "data": { "customers": [...], "orders": [] }
//! }
//! ```
//!
//! `metadata.tables` names only tables that have records; `totalRecords`
//! sums every table. `metadata` may be `null` when a backup is taken without
//! it.

mod builder;
mod document;
mod registry;
mod source;

pub use builder::SnapshotBuilder;
pub use document::{SnapshotDocument, SnapshotMetadata, SNAPSHOT_VERSION};
pub use registry::{TableRegistry, TableSpec};
pub use source::{DataSource, JsonDirSource};
