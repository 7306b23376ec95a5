//! Error types for the diff crate.

use recon_doc::SerializationError;

/// Errors that can occur during analysis.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A node could not be rendered for a record's content.
    #[error("serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// The analysis settings are inconsistent.
    #[error("invalid diff configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
