//! Match types returned by store searches.
//!
//! Store matches carry the full chunk plus a snapshot of its owning
//! document, so the retrieval layer can project whatever response shape it
//! needs without going back to the store.

use quarry_core::{Chunk, Document};

/// A semantic search match: a chunk with its cosine similarity.
#[derive(Debug, Clone)]
pub struct SemanticMatch {
    pub chunk: Chunk,
    pub document: Document,
    /// `1 - cosine_distance` against the query embedding.
    pub similarity: f32,
}

/// A lexical search match: a chunk with its BM25 rank.
#[derive(Debug, Clone)]
pub struct KeywordMatch {
    pub chunk: Chunk,
    pub document: Document,
    /// BM25 relevance score.
    pub rank: f32,
}
