//! Per-file application outcomes.

use recon_doc::Document;
use recon_types::{ChangeType, LocationPath};
use serde::Serialize;

/// Why an approved record was not applied.
///
/// Warnings never stop the file from being produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplyWarning {
    /// The record's path (or its parent) does not exist in the document.
    #[error("{change_type} at {path}: path not found ({reason})")]
    PathResolution {
        change_type: ChangeType,
        path: LocationPath,
        reason: String,
    },

    /// An ADD whose element is already in place.
    #[error("ADD at {path}: element already present")]
    AlreadyPresent { path: LocationPath },

    /// The record's new content is not a usable element.
    #[error("{change_type} at {path}: invalid content ({reason})")]
    InvalidContent {
        change_type: ChangeType,
        path: LocationPath,
        reason: String,
    },

    /// The record cannot be applied as written.
    #[error("{change_type} at {path}: {reason}")]
    InvalidRecord {
        change_type: ChangeType,
        path: LocationPath,
        reason: String,
    },
}

impl ApplyWarning {
    pub fn path(&self) -> &LocationPath {
        match self {
            ApplyWarning::PathResolution { path, .. }
            | ApplyWarning::AlreadyPresent { path }
            | ApplyWarning::InvalidContent { path, .. }
            | ApplyWarning::InvalidRecord { path, .. } => path,
        }
    }
}

/// Counts and warnings for one file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Approved records that took effect.
    pub applied: usize,
    /// Records skipped because they were not approved.
    pub not_approved: usize,
    /// Approved records that were skipped, one warning each.
    pub warnings: Vec<ApplyWarning>,
}

impl ApplyReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of approved records that were skipped.
    pub fn skipped(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub(crate) fn warn(&mut self, warning: ApplyWarning) {
        self.warnings.push(warning);
    }
}

/// The updated document for one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileApplication {
    /// `None` when the file is removed from (or never enters) the output.
    pub document: Option<Document>,
    pub report: ApplyReport,
}

/// Like [`FileApplication`], with the document already serialized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextApplication {
    pub text: Option<String>,
    pub report: ApplyReport,
}
