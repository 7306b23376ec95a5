//! Batch analysis: every file pair of two corpora, in parallel.

use std::fs;
use std::path::Path;

use rayon::prelude::*;
use recon_diff::{ChangeRecordBuilder, DiffConfig, DiffError};
use recon_doc::Document;
use recon_store::ChangeStore;
use recon_types::ChangeRecord;
use tracing::{debug, info, warn};

use crate::cancel::CancelFlag;
use crate::corpus::{pair, Corpus, CorpusFile, FilePair};
use crate::error::BatchResult;
use crate::summary::{ChangeTypeCounts, FileError, RunSummary, Stage};

/// Records and totals of one analysis run.
#[derive(Clone, Debug, Default)]
pub struct Analysis {
    pub records: Vec<ChangeRecord>,
    pub summary: RunSummary,
}

#[derive(Clone, Copy)]
enum PairKind {
    Compared,
    Created,
    Removed,
}

enum Outcome {
    Done(PairKind, Vec<ChangeRecord>),
    Failed(FileError),
    Cancelled,
}

/// Compares an original corpus against a revised one.
pub struct Analyzer {
    builder: ChangeRecordBuilder,
    cancel: CancelFlag,
}

impl Analyzer {
    pub fn new(config: DiffConfig) -> BatchResult<Self> {
        config.validate()?;
        Ok(Self {
            builder: ChangeRecordBuilder::new(config),
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &DiffConfig {
        self.builder.config()
    }

    /// Scan both directories and analyze them.
    pub fn analyze_dirs(&self, original: &Path, revised: &Path) -> BatchResult<Analysis> {
        let original = Corpus::scan(original)?;
        let revised = Corpus::scan(revised)?;
        Ok(self.analyze(&original, &revised))
    }

    /// Analyze both directories and save the records to `store`.
    pub fn analyze_into(
        &self,
        original: &Path,
        revised: &Path,
        store: &dyn ChangeStore,
    ) -> BatchResult<Analysis> {
        let analysis = self.analyze_dirs(original, revised)?;
        store.save(&analysis.records)?;
        Ok(analysis)
    }

    /// Records for every file pair, in file id order.
    ///
    /// A file that cannot be read, parsed or rendered is reported in the
    /// summary and contributes no records.
    pub fn analyze(&self, original: &Corpus, revised: &Corpus) -> Analysis {
        let pairs = pair(original, revised);
        info!(pairs = pairs.len(), "starting analysis");

        let outcomes: Vec<Outcome> = pairs.par_iter().map(|p| self.analyze_pair(*p)).collect();

        let mut summary = RunSummary::new();
        let mut records = Vec::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Done(kind, found) => {
                    summary.files.processed += 1;
                    match kind {
                        PairKind::Compared if found.is_empty() => summary.files.unchanged += 1,
                        PairKind::Compared => summary.files.modified += 1,
                        PairKind::Created => summary.files.created += 1,
                        PairKind::Removed => summary.files.removed += 1,
                    }
                    records.extend(found);
                }
                Outcome::Failed(error) => {
                    warn!(file = %error.file_id, stage = %error.stage, error = %error.message, "file skipped");
                    summary.fail(error);
                }
                Outcome::Cancelled => summary.files.cancelled += 1,
            }
        }
        summary.cancelled = summary.files.cancelled > 0;

        let records = self.builder.finalize(records);
        summary.records.emitted = records.len();
        summary.changes = ChangeTypeCounts::from_records(&records);
        info!(
            files = summary.files.processed,
            failed = summary.files.failed,
            records = records.len(),
            moves = summary.changes.moved,
            "analysis finished"
        );
        Analysis { records, summary }
    }

    fn analyze_pair(&self, pair: FilePair<'_>) -> Outcome {
        if self.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }
        let file_id = pair.file_id();
        let result = match pair {
            FilePair::Both { original, revised } => load(original).and_then(|original| {
                let revised = load(revised)?;
                self.builder
                    .diff_documents(file_id, &original, &revised)
                    .map(|records| (PairKind::Compared, records))
                    .map_err(|e| diff_error(file_id, e))
            }),
            FilePair::OriginalOnly(file) => load(file).and_then(|doc| {
                self.builder
                    .removed_file(file_id, &doc)
                    .map(|records| (PairKind::Removed, records))
                    .map_err(|e| diff_error(file_id, e))
            }),
            FilePair::RevisedOnly(file) => load(file).and_then(|doc| {
                self.builder
                    .added_file(file_id, &doc)
                    .map(|records| (PairKind::Created, records))
                    .map_err(|e| diff_error(file_id, e))
            }),
        };
        match result {
            Ok((kind, records)) => {
                debug!(file = %file_id, records = records.len(), "analyzed file");
                Outcome::Done(kind, records)
            }
            Err(error) => Outcome::Failed(error),
        }
    }
}

fn load(file: &CorpusFile) -> Result<Document, FileError> {
    let bytes = fs::read(&file.path).map_err(|e| {
        FileError::new(&file.file_id, Stage::Read, format!("{}: {e}", file.path.display()))
    })?;
    Document::from_bytes(&bytes).map_err(|e| FileError::new(&file.file_id, Stage::Parse, e))
}

fn diff_error(file_id: &str, error: DiffError) -> FileError {
    let stage = match error {
        DiffError::Serialization(_) => Stage::Serialize,
        DiffError::InvalidConfig(_) => Stage::Diff,
    };
    FileError::new(file_id, stage, error)
}
