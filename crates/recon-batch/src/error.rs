//! Error types for the batch crate.

use std::path::PathBuf;

/// Errors that stop a whole run.
///
/// Failures confined to one file are not errors; they are collected in the
/// run summary and the remaining files are still processed.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// A corpus root is missing or is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Walking a corpus directory failed.
    #[error("cannot scan corpus: {0}")]
    Walk(#[from] walkdir::Error),

    /// I/O error outside any single file unit.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The analysis settings were rejected.
    #[error(transparent)]
    Config(#[from] recon_diff::DiffError),

    /// Reading or writing the change records failed.
    #[error("store error: {0}")]
    Store(#[from] recon_store::StoreError),
}

/// Convenience alias for batch results.
pub type BatchResult<T> = Result<T, BatchError>;
