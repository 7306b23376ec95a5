use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid change type: {0:?}")]
    InvalidChangeType(String),

    #[error("invalid location path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Convenience alias for type-level results.
pub type TypeResult<T> = Result<T, TypeError>;
