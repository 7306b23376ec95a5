//! Change applicator for xmlrecon.
//!
//! Replays the approved subset of a file's change records onto its original
//! document. Records that cannot be applied are skipped with a warning; the
//! file is still produced from the rest.
//!
//! # Key Types
//!
//! - [`ChangeApplicator`] -- Applies records to one document
//! - [`FileApplication`] / [`TextApplication`] -- Updated document plus report
//! - [`ApplyReport`] / [`ApplyWarning`] -- Applied counts and skipped records

pub mod applicator;
pub mod error;
pub mod report;

pub use applicator::ChangeApplicator;
pub use error::{ApplyError, ApplyResult};
pub use report::{ApplyReport, ApplyWarning, FileApplication, TextApplication};
