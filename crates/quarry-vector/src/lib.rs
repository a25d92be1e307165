//! Semantic vector search for Quarry.
//!
//! # Modules
//!
//! - [`similarity`]: cosine similarity primitives
//! - [`index`]: exact-scan vector index with a fixed dimension
//! - [`embedding`]: `EmbeddingProvider` trait and deterministic mock

#![doc = include_str!("../README.md")]

pub mod embedding;
pub mod index;
pub mod similarity;

// Re-export key types at crate root for convenience
pub use embedding::{EmbeddingProvider, MockEmbeddingProvider};
pub use index::{SemanticHit, VectorIndex};
pub use similarity::{cosine_distance, cosine_similarity};
