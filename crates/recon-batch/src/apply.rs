//! Batch application: approved records replayed onto a source corpus.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use recon_apply::{ApplyError, ApplyReport, ChangeApplicator};
use recon_store::{ApprovalCounts, ChangeStore};
use recon_types::ChangeRecord;
use tracing::{debug, info, warn};

use crate::cancel::CancelFlag;
use crate::corpus::{output_path, Corpus, CorpusFile};
use crate::error::{BatchError, BatchResult};
use crate::summary::{ChangeTypeCounts, FileError, RunSummary, Stage};

struct Unit<'a> {
    file_id: &'a str,
    source: Option<&'a CorpusFile>,
    records: Vec<ChangeRecord>,
}

enum Written {
    Passthrough,
    Modified,
    Created,
    Removed,
    Absent,
}

enum Outcome<'a> {
    Done(&'a str, Written, ApplyReport),
    Failed(FileError),
    Cancelled,
}

/// Writes the updated corpus for a reviewed record set.
#[derive(Default)]
pub struct Applier {
    applicator: ChangeApplicator,
    cancel: CancelFlag,
}

impl Applier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Load the reviewed records from `store` and apply them.
    pub fn apply_from(
        &self,
        source: &Path,
        store: &dyn ChangeStore,
        destination: &Path,
    ) -> BatchResult<RunSummary> {
        let loaded = store.load()?;
        for row in &loaded.malformed {
            warn!(line = row.line, reason = %row.reason, "change row skipped");
        }
        let mut summary = self.apply_dir(source, &loaded.records, destination)?;
        summary.malformed_rows = loaded.malformed.len();
        Ok(summary)
    }

    /// Scan `source` and apply `records` to it.
    pub fn apply_dir(
        &self,
        source: &Path,
        records: &[ChangeRecord],
        destination: &Path,
    ) -> BatchResult<RunSummary> {
        let corpus = Corpus::scan(source)?;
        self.apply(&corpus, records, destination)
    }

    /// Write one output document per source file into `destination`.
    ///
    /// Files without approved records are copied byte for byte. Files whose
    /// approved records remove them are not written. Approved whole-file
    /// ADDs for ids missing from the source create new files.
    pub fn apply(
        &self,
        corpus: &Corpus,
        records: &[ChangeRecord],
        destination: &Path,
    ) -> BatchResult<RunSummary> {
        fs::create_dir_all(destination).map_err(|source| BatchError::Io {
            path: destination.to_path_buf(),
            source,
        })?;

        let mut summary = RunSummary::new();
        let mut approvals = ApprovalCounts::default();
        for record in records {
            approvals.add(record.approval);
        }
        summary.approvals = approvals;
        summary.changes = ChangeTypeCounts::from_records(records.iter().filter(|r| r.approval.is_approved()));

        let units = units(corpus, records);
        info!(files = units.len(), approved = approvals.approved, "starting application");

        let outcomes: Vec<Outcome<'_>> = units
            .par_iter()
            .map(|unit| self.apply_unit(unit, destination))
            .collect();

        for outcome in outcomes {
            match outcome {
                Outcome::Done(file_id, written, report) => {
                    summary.files.processed += 1;
                    match written {
                        Written::Passthrough => summary.files.unchanged += 1,
                        Written::Modified => summary.files.modified += 1,
                        Written::Created => summary.files.created += 1,
                        Written::Removed => summary.files.removed += 1,
                        Written::Absent => {}
                    }
                    summary.absorb_report(file_id, report);
                }
                Outcome::Failed(error) => {
                    warn!(file = %error.file_id, stage = %error.stage, error = %error.message, "file skipped");
                    summary.fail(error);
                }
                Outcome::Cancelled => summary.files.cancelled += 1,
            }
        }
        summary.cancelled = summary.files.cancelled > 0;

        info!(
            files = summary.files.processed,
            failed = summary.files.failed,
            applied = summary.records.applied,
            skipped = summary.records.skipped,
            "application finished"
        );
        Ok(summary)
    }

    fn apply_unit<'a>(&self, unit: &'a Unit<'a>, destination: &Path) -> Outcome<'a> {
        if self.cancel.is_cancelled() {
            return Outcome::Cancelled;
        }
        match self.write_unit(unit, destination) {
            Ok((written, report)) => Outcome::Done(unit.file_id, written, report),
            Err(error) => Outcome::Failed(error),
        }
    }

    fn write_unit(&self, unit: &Unit<'_>, destination: &Path) -> Result<(Written, ApplyReport), FileError> {
        let file_id = unit.file_id;
        let approved = unit.records.iter().any(|r| r.approval.is_approved());

        if let (Some(source), false) = (unit.source, approved) {
            let target = destination.join(&source.relative);
            create_parent(file_id, &target)?;
            fs::copy(&source.path, &target)
                .map_err(|e| FileError::new(file_id, Stage::Write, format!("{}: {e}", target.display())))?;
            debug!(file = %file_id, "copied unchanged");
            let report = ApplyReport {
                not_approved: unit.records.len(),
                ..ApplyReport::default()
            };
            return Ok((Written::Passthrough, report));
        }

        let text = match unit.source {
            Some(source) => Some(fs::read_to_string(&source.path).map_err(|e| {
                FileError::new(file_id, Stage::Read, format!("{}: {e}", source.path.display()))
            })?),
            None => None,
        };

        let application = self
            .applicator
            .apply_source(text.as_deref(), &unit.records)
            .map_err(|e| apply_error(file_id, e))?;

        let written = match (&application.text, unit.source) {
            (Some(updated), source) => {
                let target = target_path(destination, file_id, source);
                create_parent(file_id, &target)?;
                fs::write(&target, updated)
                    .map_err(|e| FileError::new(file_id, Stage::Write, format!("{}: {e}", target.display())))?;
                debug!(file = %file_id, applied = application.report.applied, "wrote updated file");
                if source.is_some() {
                    Written::Modified
                } else {
                    Written::Created
                }
            }
            (None, Some(_)) => {
                debug!(file = %file_id, "file removed from output");
                Written::Removed
            }
            (None, None) => Written::Absent,
        };
        Ok((written, application.report))
    }
}

/// One unit per source file plus one per unknown file id with approved records.
fn units<'a>(corpus: &'a Corpus, records: &'a [ChangeRecord]) -> Vec<Unit<'a>> {
    let mut by_file: BTreeMap<&'a str, Vec<ChangeRecord>> = BTreeMap::new();
    for record in records {
        by_file.entry(record.file_id.as_str()).or_default().push(record.clone());
    }

    let mut units: Vec<Unit<'a>> = corpus
        .iter()
        .map(|file| Unit {
            file_id: &file.file_id,
            source: Some(file),
            records: by_file.remove(file.file_id.as_str()).unwrap_or_default(),
        })
        .collect();

    for (file_id, records) in by_file {
        if records.iter().any(|r| r.approval.is_approved()) {
            units.push(Unit {
                file_id,
                source: None,
                records,
            });
        } else {
            debug!(file = %file_id, records = records.len(), "records for unknown file ignored");
        }
    }
    units
}

fn target_path(destination: &Path, file_id: &str, source: Option<&CorpusFile>) -> PathBuf {
    match source {
        Some(file) => destination.join(&file.relative),
        None => output_path(destination, file_id),
    }
}

fn create_parent(file_id: &str, target: &Path) -> Result<(), FileError> {
    match target.parent() {
        Some(parent) => fs::create_dir_all(parent)
            .map_err(|e| FileError::new(file_id, Stage::Write, format!("{}: {e}", parent.display()))),
        None => Ok(()),
    }
}

fn apply_error(file_id: &str, error: ApplyError) -> FileError {
    let stage = match error {
        ApplyError::Parse(_) => Stage::Parse,
        ApplyError::Serialization(_) => Stage::Serialize,
    };
    FileError::new(file_id, stage, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_store::InMemoryChangeStore;
    use recon_types::{Approval, LocationPath};

    fn source(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        dir
    }

    fn read(root: &Path, name: &str) -> String {
        fs::read_to_string(root.join(name)).unwrap()
    }

    #[test]
    fn untouched_files_are_copied_verbatim() {
        let body = "<?xml version='1.0'?>\r\n<r   a = '1' >\r\n\t<v>1</v>\r\n</r>\r\n";
        let src = source(&[("quirky.xml", body), ("nested/also.xml", "<r/>")]);
        let out = tempfile::tempdir().unwrap();

        let rejected = vec![ChangeRecord::modify("quirky", LocationPath::new("/v"), "1", "2")
            .with_approval(Approval::Rejected)];
        let summary = Applier::new().apply_dir(src.path(), &rejected, out.path()).unwrap();

        assert_eq!(read(out.path(), "quirky.xml"), body);
        assert_eq!(read(out.path(), "nested/also.xml"), "<r/>");
        assert_eq!(summary.files.unchanged, 2);
        assert_eq!(summary.records.not_approved, 1);
        assert_eq!(summary.approvals.rejected, 1);
    }

    #[test]
    fn approved_records_rewrite_their_file() {
        let src = source(&[("doc.xml", "<r>\n  <version>1.0</version>\n</r>\n")]);
        let out = tempfile::tempdir().unwrap();

        let records = vec![ChangeRecord::modify("doc", LocationPath::new("/version"), "1.0", "1.1")
            .with_approval(Approval::Approved)];
        let summary = Applier::new().apply_dir(src.path(), &records, out.path()).unwrap();

        assert_eq!(read(out.path(), "doc.xml"), "<r>\n  <version>1.1</version>\n</r>\n");
        assert_eq!(summary.files.modified, 1);
        assert_eq!(summary.records.applied, 1);
        assert!(summary.is_clean());
    }

    #[test]
    fn whole_file_records_create_and_remove_files() {
        let src = source(&[("old.xml", "<r/>")]);
        let out = tempfile::tempdir().unwrap();

        let records = vec![
            ChangeRecord::delete("old", LocationPath::root(), "<r/>").with_approval(Approval::Approved),
            ChangeRecord::add("fresh/new", LocationPath::root(), "<q>hi</q>").with_approval(Approval::Approved),
            ChangeRecord::add("ignored", LocationPath::root(), "<z/>"),
        ];
        let summary = Applier::new().apply_dir(src.path(), &records, out.path()).unwrap();

        assert!(!out.path().join("old.xml").exists());
        assert_eq!(read(out.path(), "fresh/new.xml"), "<q>hi</q>");
        assert!(!out.path().join("ignored.xml").exists());
        assert_eq!(summary.files.removed, 1);
        assert_eq!(summary.files.created, 1);
    }

    #[test]
    fn unresolvable_records_warn_but_the_file_is_written() {
        let src = source(&[("doc.xml", "<r><v>1</v></r>")]);
        let out = tempfile::tempdir().unwrap();

        let records = vec![
            ChangeRecord::modify("doc", LocationPath::new("/v"), "1", "2").with_approval(Approval::Approved),
            ChangeRecord::delete("doc", LocationPath::new("/missing"), "<missing/>")
                .with_approval(Approval::Approved),
        ];
        let summary = Applier::new().apply_dir(src.path(), &records, out.path()).unwrap();

        assert_eq!(read(out.path(), "doc.xml"), "<r><v>2</v></r>");
        assert_eq!(summary.records.applied, 1);
        assert_eq!(summary.records.skipped, 1);
        assert_eq!(summary.files.warned, 1);
        assert_eq!(summary.warnings[0].file_id, "doc");
    }

    #[test]
    fn malformed_sources_are_isolated() {
        let src = source(&[("bad.xml", "<r><v>1</r>"), ("good.xml", "<r><v>1</v></r>")]);
        let out = tempfile::tempdir().unwrap();

        let records = vec![
            ChangeRecord::modify("bad", LocationPath::new("/v"), "1", "2").with_approval(Approval::Approved),
            ChangeRecord::modify("good", LocationPath::new("/v"), "1", "2").with_approval(Approval::Approved),
        ];
        let summary = Applier::new().apply_dir(src.path(), &records, out.path()).unwrap();

        assert_eq!(summary.files.failed, 1);
        assert_eq!(summary.errors[0].stage, Stage::Parse);
        assert_eq!(read(out.path(), "good.xml"), "<r><v>2</v></r>");
    }

    #[test]
    fn records_load_from_a_store() {
        let src = source(&[("doc.xml", "<r><v>1</v></r>")]);
        let out = tempfile::tempdir().unwrap();
        let store = InMemoryChangeStore::new();
        store
            .save(&[ChangeRecord::modify("doc", LocationPath::new("/v"), "1", "2")
                .with_approval(Approval::Approved)])
            .unwrap();

        let summary = Applier::new().apply_from(src.path(), &store, out.path()).unwrap();
        assert_eq!(summary.approvals.approved, 1);
        assert_eq!(read(out.path(), "doc.xml"), "<r><v>2</v></r>");
    }
}
