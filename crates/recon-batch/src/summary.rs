//! Per-run accumulator returned by the analysis and application runs.

use std::fmt;

use recon_apply::{ApplyReport, ApplyWarning};
use recon_store::ApprovalCounts;
use recon_types::{ChangeRecord, ChangeType};
use serde::Serialize;

/// Totals for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files: FileCounts,
    pub records: RecordCounts,
    /// Records by change type: emitted ones for an analysis, approved ones
    /// for an application.
    pub changes: ChangeTypeCounts,
    /// Reviewer decisions in the record set (application only).
    pub approvals: ApprovalCounts,
    /// Rows of the change file that could not be decoded.
    pub malformed_rows: usize,
    pub warnings: Vec<FileWarning>,
    pub errors: Vec<FileError>,
    /// `true` when the run stopped before every unit was processed.
    pub cancelled: bool,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// No failed files and no skipped records.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && !self.cancelled
    }

    pub(crate) fn fail(&mut self, error: FileError) {
        self.files.failed += 1;
        self.errors.push(error);
    }

    pub(crate) fn absorb_report(&mut self, file_id: &str, report: ApplyReport) {
        self.records.applied += report.applied;
        self.records.not_approved += report.not_approved;
        self.records.skipped += report.skipped();
        if !report.is_clean() {
            self.files.warned += 1;
        }
        self.warnings.extend(report.warnings.into_iter().map(|warning| FileWarning {
            file_id: file_id.to_string(),
            warning,
        }));
    }
}

/// File-level counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FileCounts {
    /// Units processed without error.
    pub processed: usize,
    /// Identical pairs (analysis) or files copied verbatim (application).
    pub unchanged: usize,
    /// Pairs with differences, or files rewritten from approved records.
    pub modified: usize,
    /// Files only in the revised set, or new files written from records.
    pub created: usize,
    /// Files only in the original set, or files dropped from the output.
    pub removed: usize,
    /// Files with at least one skipped record.
    pub warned: usize,
    pub failed: usize,
    /// Units not started because the run was cancelled.
    pub cancelled: usize,
}

/// Record-level counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    /// Records produced by an analysis.
    pub emitted: usize,
    pub applied: usize,
    /// Approved records that could not be applied.
    pub skipped: usize,
    pub not_approved: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChangeTypeCounts {
    pub add: usize,
    pub modify: usize,
    pub delete: usize,
    #[serde(rename = "move")]
    pub moved: usize,
}

impl ChangeTypeCounts {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ChangeRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            counts.add(record.change_type);
        }
        counts
    }

    pub fn add(&mut self, change_type: ChangeType) {
        match change_type {
            ChangeType::Add => self.add += 1,
            ChangeType::Modify => self.modify += 1,
            ChangeType::Delete => self.delete += 1,
            ChangeType::Move => self.moved += 1,
        }
    }

    pub fn get(&self, change_type: ChangeType) -> usize {
        match change_type {
            ChangeType::Add => self.add,
            ChangeType::Modify => self.modify,
            ChangeType::Delete => self.delete,
            ChangeType::Move => self.moved,
        }
    }

    pub fn total(&self) -> usize {
        self.add + self.modify + self.delete + self.moved
    }
}

/// A skipped record, tagged with its file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileWarning {
    pub file_id: String,
    #[serde(flatten)]
    pub warning: ApplyWarning,
}

/// Where in a unit's processing a failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Read,
    Parse,
    Diff,
    Serialize,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Read => "read",
            Stage::Parse => "parse",
            Stage::Diff => "diff",
            Stage::Serialize => "serialize",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

/// A file that could not be processed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub file_id: String,
    pub stage: Stage,
    pub message: String,
}

impl FileError {
    pub fn new(file_id: impl Into<String>, stage: Stage, message: impl fmt::Display) -> Self {
        Self {
            file_id: file_id.into(),
            stage,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.file_id, self.stage, self.message)
    }
}
