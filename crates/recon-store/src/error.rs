use std::path::PathBuf;

/// Errors from change store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The CSV reader or writer failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error on the backing file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required column is absent from the header row.
    #[error("missing column: {0}")]
    MissingColumn(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
