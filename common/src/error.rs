use thiserror::Error;

use crate::model::PrivacyLevel;

/// The umbrella error type shared by every crate in the workspace.
///
/// Only [`AppError::PrivacyViolation`], [`AppError::ContextNotFound`], and
/// [`AppError::Closed`] are fatal to a `get_context` call; every other
/// variant is captured per-source or per-stage and degrades to a fallback
/// path instead of aborting the request.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("privacy violation during {operation}: request level {provided:?} is below ceiling {required:?}")]
    PrivacyViolation {
        operation: String,
        required: PrivacyLevel,
        provided: PrivacyLevel,
    },
    #[error("no chunks produced for query: {0}")]
    ContextNotFound(String),
    #[error("source '{source_name}' error: {cause}")]
    SourceError { source_name: String, cause: String },
    #[error("source '{0}' timed out")]
    SourceTimeout(String),
    #[error("vector index error during {operation}: {cause}")]
    VectorIndexError { operation: String, cause: String },
    #[error("cache error: {0}")]
    CacheError(String),
    #[error("orchestrator is closed")]
    Closed,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AppError {
    /// Fatal errors abort `get_context`; everything else is recorded and
    /// the pipeline continues with degraded input.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::PrivacyViolation { .. } | AppError::ContextNotFound(_) | AppError::Closed
        )
    }
}
