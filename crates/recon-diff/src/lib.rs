//! Diff engine for xmlrecon.
//!
//! Compares an original and a revised document, producing reviewable change
//! records with stable location paths and focused word-level summaries.
//!
//! # Key Types
//!
//! - [`PathAddresser`] -- Location paths for elements, keyed where possible
//! - [`TreeAligner`] / [`Alignment`] -- Element pairing between two trees
//! - [`TokenSummarizer`] -- Focused summaries of text changes
//! - [`MoveDetector`] -- Cross-file DELETE/ADD pairs reclassified as moves
//! - [`ChangeRecordBuilder`] -- Records for a document pair or a whole batch
//! - [`DiffConfig`] -- Identifying attributes and summary/move limits

pub mod address;
pub mod align;
pub mod builder;
pub mod config;
pub mod error;
pub mod moves;
pub mod token_diff;

pub use address::{element_at, element_at_mut, find_child, resolve, resolve_route, PathAddresser};
pub use align::{Alignment, Located, MatchedPair, TreeAligner};
pub use builder::{dedup, ChangeRecordBuilder};
pub use config::DiffConfig;
pub use error::{DiffError, DiffResult};
pub use moves::{MoveDetection, MoveDetector, MovePair};
pub use token_diff::{summarize, TokenSummarizer};
