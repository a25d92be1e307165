//! The retrieval engine: query routing and the public search API.
//!
//! Routing is decided per request by which inputs are present: an embedding
//! alone runs semantic search, text alone runs lexical search, both run
//! hybrid (two independent searches whose lists stay separate). A request
//! with neither input is invalid.
//!
//! The engine is stateless across requests; the only shared resource is the
//! store, whose lock discipline makes concurrent searches safe.

use std::sync::Arc;

use chrono::Utc;
use log::debug;
use quarry_core::{DateWindow, Error, Result, Scope};
use quarry_fts::QueryParser;
use quarry_store::ChunkStore;

use crate::fusion::fuse_recency;
use crate::types::{
    HybridResults, KeywordHit, RetrievalConfig, SearchRequest, SearchResponse, SemanticHit,
};

/// How a request will be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Semantic,
    Keyword,
    Hybrid,
}

/// Decide the search mode for a request.
pub fn route(request: &SearchRequest) -> Result<SearchMode> {
    let has_text = request
        .text
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    let has_embedding = request.embedding.as_deref().is_some_and(|e| !e.is_empty());

    match (has_embedding, has_text) {
        (true, true) => Ok(SearchMode::Hybrid),
        (true, false) => Ok(SearchMode::Semantic),
        (false, true) => Ok(SearchMode::Keyword),
        (false, false) => Err(Error::invalid_data(
            "search request needs query text, an embedding, or both",
        )),
    }
}

/// The hybrid retrieval engine.
pub struct Engine {
    store: Arc<ChunkStore>,
    parser: QueryParser,
    config: RetrievalConfig,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine over a store.
    ///
    /// Fails with `DimensionMismatch` when the configured dimension differs
    /// from the store's, so the disagreement surfaces at construction
    /// instead of on the first query.
    pub fn new(store: Arc<ChunkStore>, config: RetrievalConfig) -> Result<Self> {
        let expected = store.dimension();
        if config.dimension != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: config.dimension,
            });
        }
        let parser = QueryParser::new(store.fts_config());
        Ok(Self {
            store,
            parser,
            config,
        })
    }

    /// The engine configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<ChunkStore> {
        &self.store
    }

    /// Route and execute a request.
    pub async fn search(&self, request: &SearchRequest, scope: Scope) -> Result<SearchResponse> {
        match route(request)? {
            SearchMode::Semantic => {
                let embedding = request.embedding.as_deref().unwrap_or_default();
                let hits = self
                    .semantic_search(
                        embedding,
                        request.match_count,
                        scope,
                        request.window(),
                        request.recency_weight,
                    )
                    .await?;
                Ok(SearchResponse::Semantic { hits })
            }
            SearchMode::Keyword => {
                let text = request.text.as_deref().unwrap_or_default();
                let hits = self
                    .keyword_search(text, request.match_count, scope, request.window())
                    .await?;
                Ok(SearchResponse::Keyword { hits })
            }
            SearchMode::Hybrid => {
                // Two independent searches, issued concurrently; their
                // score scales stay separate in the response.
                let embedding = request.embedding.as_deref().unwrap_or_default();
                let text = request.text.as_deref().unwrap_or_default();
                let (semantic, keyword) = tokio::join!(
                    self.semantic_search(
                        embedding,
                        request.match_count,
                        scope,
                        request.window(),
                        request.recency_weight,
                    ),
                    self.keyword_search(text, request.match_count, scope, request.window()),
                );
                Ok(SearchResponse::Hybrid {
                    hits: HybridResults {
                        semantic: semantic?,
                        keyword: keyword?,
                    },
                })
            }
        }
    }

    /// Semantic search with optional recency-weighted fusion.
    ///
    /// Results are ordered by final score descending; `recency_weight = 0`
    /// yields exactly the similarity ordering. Errors: `DimensionMismatch`
    /// when the embedding length differs from `D`, `IndexMigrating` during
    /// a dimension migration.
    pub async fn semantic_search(
        &self,
        embedding: &[f32],
        match_count: Option<usize>,
        scope: Scope,
        window: DateWindow,
        recency_weight: f32,
    ) -> Result<Vec<SemanticHit>> {
        let k = match_count.unwrap_or(self.config.default_semantic_count);
        let matches = self.store.semantic_search(embedding, k, scope, window)?;
        debug!("semantic search: {} hits (k={k})", matches.len());

        let as_of = Utc::now().date_naive();
        let mut hits: Vec<SemanticHit> = matches
            .iter()
            .map(|m| {
                let score = fuse_recency(
                    m.similarity,
                    m.document.document_date,
                    as_of,
                    recency_weight,
                    self.config.recency_decay_rate,
                );
                SemanticHit::from_match(m, score)
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
        });
        Ok(hits)
    }

    /// Keyword search over the lexical index.
    ///
    /// Errors: `IndexMigrating` during a dimension migration. An index
    /// failure is surfaced, never flattened into an empty list.
    pub async fn keyword_search(
        &self,
        text: &str,
        match_count: Option<usize>,
        scope: Scope,
        window: DateWindow,
    ) -> Result<Vec<KeywordHit>> {
        let k = match_count.unwrap_or(self.config.default_keyword_count);
        let query = self.parser.parse(text);
        let matches = self.store.keyword_search(&query, k, scope, window)?;
        debug!("keyword search: {} hits (k={k})", matches.len());

        Ok(matches.iter().map(KeywordHit::from_match).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
