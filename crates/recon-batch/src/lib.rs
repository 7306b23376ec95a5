//! Batch runs for xmlrecon.
//!
//! Pairs the documents of two corpora, analyzes every pair in parallel and
//! later replays reviewed records onto the original corpus. Each file is an
//! independent unit: a failure is recorded in the [`RunSummary`] and the
//! run carries on with the remaining files.
//!
//! # Key Types
//!
//! - [`Corpus`] -- The `.xml` documents below a directory, keyed by file id
//! - [`Analyzer`] -- Change records for two corpora
//! - [`Applier`] -- Updated corpus from approved records
//! - [`RunSummary`] -- File and record totals of one run
//! - [`CancelFlag`] -- Stops a run between file units

pub mod analyze;
pub mod apply;
pub mod cancel;
pub mod corpus;
pub mod error;
pub mod summary;

pub use analyze::{Analysis, Analyzer};
pub use apply::Applier;
pub use cancel::CancelFlag;
pub use corpus::{file_id_for, output_path, pair, Corpus, CorpusFile, FilePair};
pub use error::{BatchError, BatchResult};
pub use summary::{ChangeTypeCounts, FileCounts, FileError, FileWarning, RecordCounts, RunSummary, Stage};
