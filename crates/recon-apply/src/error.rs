//! Error types for the apply crate.

use recon_doc::{ParseError, SerializationError};

/// Errors that abort the application for one file.
///
/// Problems with individual records are not errors; they are reported as
/// [`ApplyWarning`](crate::ApplyWarning)s and the file is still produced.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The original document could not be parsed.
    #[error("cannot parse original document: {0}")]
    Parse(#[from] ParseError),

    /// The updated tree could not be rendered.
    #[error("cannot serialize updated document: {0}")]
    Serialization(#[from] SerializationError),
}

/// Convenience alias for apply results.
pub type ApplyResult<T> = Result<T, ApplyError>;
