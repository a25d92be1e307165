//! Chunk and document storage with synchronous index maintenance.
//!
//! # Modules
//!
//! - [`store`]: the [`ChunkStore`] and its search entry points
//! - [`matches`]: enriched match types returned by store searches

#![doc = include_str!("../README.md")]

pub mod matches;
pub mod store;

// Re-export key types at crate root for convenience
pub use matches::{KeywordMatch, SemanticMatch};
pub use store::ChunkStore;
