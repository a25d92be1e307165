//! Request, response, and configuration types for the retrieval engine.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use quarry_core::DateWindow;
use quarry_store::{KeywordMatch, SemanticMatch};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fusion::DEFAULT_RECENCY_DECAY_RATE;

/// Retrieval engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Embedding dimension `D`; checked against the store's dimension when
    /// the engine is constructed.
    pub dimension: usize,

    /// Default result count for semantic search.
    #[serde(default = "default_semantic_count")]
    pub default_semantic_count: usize,

    /// Default result count for keyword search.
    #[serde(default = "default_keyword_count")]
    pub default_keyword_count: usize,

    /// Exponential decay rate for recency scoring, in 1/years.
    #[serde(default = "default_decay_rate")]
    pub recency_decay_rate: f32,
}

fn default_semantic_count() -> usize {
    5
}

fn default_keyword_count() -> usize {
    20
}

fn default_decay_rate() -> f32 {
    DEFAULT_RECENCY_DECAY_RATE
}

impl RetrievalConfig {
    /// Configuration with defaults for a given embedding dimension.
    pub fn for_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            default_semantic_count: default_semantic_count(),
            default_keyword_count: default_keyword_count(),
            recency_decay_rate: default_decay_rate(),
        }
    }
}

/// A single retrieval request. Ephemeral: owned by the caller for the
/// duration of one call; the engine keeps no per-request state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text for lexical search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Caller-supplied query embedding for semantic search (dimension `D`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Maximum results per list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,

    /// Inclusive start date filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,

    /// Inclusive end date filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,

    /// Recency bias in `[0, 1]`; 0 is pure similarity.
    #[serde(default)]
    pub recency_weight: f32,
}

impl SearchRequest {
    /// A lexical-only request.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// A semantic-only request.
    pub fn from_embedding(embedding: Vec<f32>) -> Self {
        Self {
            embedding: Some(embedding),
            ..Default::default()
        }
    }

    /// Set both inputs for hybrid search.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Set the result count.
    pub fn with_match_count(mut self, count: usize) -> Self {
        self.match_count = Some(count);
        self
    }

    /// Set the date window.
    pub fn with_dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Set the recency weight.
    pub fn with_recency_weight(mut self, weight: f32) -> Self {
        self.recency_weight = weight;
        self
    }

    /// The request's date window.
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.date_from, self.date_to)
    }
}

/// A semantic search result row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticHit {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub chunk_index: u32,
    /// Raw cosine similarity, untouched by fusion.
    pub similarity: f32,
    /// Final score after recency fusion; equals `similarity` when
    /// `recency_weight` is 0 or the document is undated.
    pub score: f32,
}

impl SemanticHit {
    pub(crate) fn from_match(m: &SemanticMatch, score: f32) -> Self {
        Self {
            id: m.chunk.id,
            document_id: m.chunk.document_id,
            content: m.chunk.content.clone(),
            chunk_index: m.chunk.chunk_index,
            similarity: m.similarity,
            score,
        }
    }
}

/// A keyword search result row, with document metadata for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordHit {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub chunk_index: u32,
    pub token_count: u32,
    /// BM25 relevance score.
    pub rank: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_title: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub doc_topics: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_date: Option<NaiveDate>,
}

impl KeywordHit {
    pub(crate) fn from_match(m: &KeywordMatch) -> Self {
        Self {
            id: m.chunk.id,
            document_id: m.chunk.document_id,
            content: m.chunk.content.clone(),
            chunk_index: m.chunk.chunk_index,
            token_count: m.chunk.token_count,
            rank: m.rank,
            doc_title: m.document.title.clone(),
            doc_topics: m.document.topics.clone(),
            doc_date: m.document.document_date,
        }
    }
}

/// The two independent lists returned by hybrid search.
///
/// Cosine similarity and BM25 rank are not on a comparable scale; callers
/// that want one list use [`reciprocal_rank_fusion`] explicitly.
///
/// [`reciprocal_rank_fusion`]: crate::fusion::reciprocal_rank_fusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridResults {
    pub semantic: Vec<SemanticHit>,
    pub keyword: Vec<KeywordHit>,
}

/// A routed search outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SearchResponse {
    Semantic { hits: Vec<SemanticHit> },
    Keyword { hits: Vec<KeywordHit> },
    Hybrid { hits: HybridResults },
}

// ============================================================================
// Tests
// ============================================================================
