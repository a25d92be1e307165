#![doc = include_str!("../README.md")]

pub mod engine;
pub mod fusion;
pub mod types;

pub use engine::{Engine, SearchMode, route};
pub use fusion::{
    DEFAULT_RECENCY_DECAY_RATE, DEFAULT_RRF_K, RrfHit, RrfSource, fuse_recency, recency_score,
    reciprocal_rank_fusion,
};
pub use types::{
    HybridResults, KeywordHit, RetrievalConfig, SearchRequest, SearchResponse, SemanticHit,
};
