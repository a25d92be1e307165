//! Configuration and result types for lexical search.

use serde::{Deserialize, Serialize};

/// Lexical search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtsConfig {
    /// Whether to filter stopwords from query terms.
    #[serde(default = "default_true")]
    pub filter_stopwords: bool,

    /// Default search result limit.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// BM25 term-frequency saturation parameter.
    #[serde(default = "default_k1")]
    pub bm25_k1: f32,

    /// BM25 length-normalization parameter.
    #[serde(default = "default_b")]
    pub bm25_b: f32,
}

fn default_true() -> bool {
    true
}

fn default_limit() -> usize {
    20
}

fn default_k1() -> f32 {
    1.2
}

fn default_b() -> f32 {
    0.75
}

impl Default for FtsConfig {
    fn default() -> Self {
        Self {
            filter_stopwords: default_true(),
            default_limit: default_limit(),
            bm25_k1: default_k1(),
            bm25_b: default_b(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
