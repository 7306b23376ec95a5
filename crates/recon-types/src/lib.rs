//! Foundation types for xmlrecon.
//!
//! This crate provides the record and addressing types shared by the
//! analyzer and the applicator. Every other recon crate depends on
//! `recon-types`.
//!
//! # Key Types
//!
//! - [`ChangeRecord`] -- One reviewable unit of difference between two document versions
//! - [`ChangeType`] -- ADD, MODIFY, DELETE or MOVE
//! - [`Approval`] -- Reviewer decision (approved, rejected, pending)
//! - [`LocationPath`] -- XPath-like address of an element within a document
//! - [`MoveLink`] -- Correlation between the two halves of a cross-file move
//! - [`RecordKey`] -- Content digest used to deduplicate records

pub mod error;
pub mod moves;
pub mod path;
pub mod record;

pub use error::{TypeError, TypeResult};
pub use moves::{MoveLink, MoveRole};
pub use path::{LocationPath, ParsedPath, Segment, Selector};
pub use record::{Approval, ChangeRecord, ChangeType, RecordKey};
