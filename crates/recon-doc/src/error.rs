//! Error types for the document crate.

use std::path::PathBuf;

/// A document could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("parse error at byte {position}: {message}")]
pub struct ParseError {
    /// Byte offset in the input where the problem was detected.
    pub position: u64,
    pub message: String,
}

impl ParseError {
    pub fn new(position: u64, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// A tree could not be rendered back to text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot serialize <{element}>: {reason}")]
pub struct SerializationError {
    pub element: String,
    pub reason: String,
}

impl SerializationError {
    pub fn new(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while loading or saving documents.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for document results.
pub type DocResult<T> = Result<T, DocError>;
