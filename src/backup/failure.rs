//! Pipeline failure reporting

use std::any::Any;
use std::fmt;

use thiserror::Error;

use crate::error::VaultError;

/// Step of a backup or restore pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Serialize,
    Encrypt,
    ResolveFolder,
    Upload,
    List,
    Delete,
    Download,
    Parse,
    Decrypt,
    /// A panic caught at the orchestrator boundary
    Internal,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serialize => "serialize",
            Self::Encrypt => "encrypt",
            Self::ResolveFolder => "resolve folder",
            Self::Upload => "upload",
            Self::List => "list",
            Self::Delete => "delete",
            Self::Download => "download",
            Self::Parse => "parse",
            Self::Decrypt => "decrypt",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipeline run that stopped at `stage`
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    #[source]
    pub error: VaultError,
}

impl PipelineFailure {
    pub fn new(stage: PipelineStage, error: impl Into<VaultError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }

    /// Convert a caught panic payload
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::new(
            PipelineStage::Internal,
            VaultError::Worker(format!("pipeline panicked: {}", message)),
        )
    }
}

/// Shorthand for `map_err` at each pipeline step
pub(crate) fn at<E: Into<VaultError>>(stage: PipelineStage) -> impl FnOnce(E) -> PipelineFailure {
    move |error| PipelineFailure::new(stage, error)
}
