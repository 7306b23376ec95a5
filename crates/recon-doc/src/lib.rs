//! Document trees for xmlrecon.
//!
//! Loads structured documents into an ordered in-memory tree and writes them
//! back. An unmodified tree serializes to exactly the bytes it was loaded
//! from; edits only disturb the markup they touch.
//!
//! # Key Types
//!
//! - [`Document`] -- Prolog, root [`Element`] and epilog
//! - [`Element`] -- Tag, ordered attributes and child [`Node`]s
//! - [`ParseError`] / [`SerializationError`] -- Per-document failures

pub mod document;
pub mod error;
mod reader;
mod writer;

pub use document::{Document, Element, Misc, Node};
pub use error::{DocError, DocResult, ParseError, SerializationError};
