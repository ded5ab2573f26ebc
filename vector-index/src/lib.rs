//! # Vector Index
//!
//! Exact nearest-neighbour search over unit-normalized embeddings, keyed by
//! external document id.
//!
//! ```text
//! add_or_update ─┐
//! delete ────────┼─► copy of FlatTable ─► persist (blob + manifest) ─► swap snapshot
//! replace_all ───┘
//! search ──────────► clone snapshot Arc ─► dot products ─► top-k
//! ```
//!
//! The flat table has no native removal, so deletion rebuilds the retained
//! rows. That keeps search exact and simple at the price of O(n) deletes,
//! which is acceptable for personal-note-sized corpora.

pub mod error;
pub mod flat;
pub mod index;
pub mod persist;

pub use error::{IndexError, Result};
pub use flat::{FlatTable, ScoredId};
pub use index::{FlatVectorIndex, IndexStats, VectorIndex};
