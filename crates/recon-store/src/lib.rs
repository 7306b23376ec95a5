//! Change record storage for xmlrecon.
//!
//! Provides the [`ChangeStore`] trait and two implementations:
//!
//! - [`CsvChangeStore`] -- The CSV review file exchanged with reviewers
//! - [`InMemoryChangeStore`] -- For tests and embedding

pub mod csv_store;
pub mod error;
pub mod memory;
pub mod traits;

pub use csv_store::{read_records, write_records, CsvChangeStore, COLUMNS};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryChangeStore;
pub use traits::{ApprovalCounts, ChangeStore, LoadedRecords, MalformedRow};
