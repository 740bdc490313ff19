//! Remote object store adapters
//!
//! The backup orchestrator talks to a folder-scoped blob store through the
//! `RemoteStore` trait. Two backends are provided:
//!
//! - `LocalFolderStore`: folders are directories under a root path
//! - `DriveStore`: a Drive-style REST API with bearer-token auth
//!
//! Failures are `RemoteError` values; a missing object is always
//! `RemoteError::NotFound`, never a transport error.

pub mod drive;
pub mod local;
pub mod token;
mod traits;

pub use drive::DriveStore;
pub use local::LocalFolderStore;
pub use token::{StaticTokenSource, TokenCache, TokenSource};
pub use traits::{with_deadline, RemoteError, RemoteFile, RemoteResult, RemoteStore, UploadedFile};
