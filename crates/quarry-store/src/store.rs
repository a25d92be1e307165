//! The chunk store.
//!
//! [`ChunkStore`] owns chunk content, document metadata, and both derived
//! indexes behind one `RwLock`. Searches take a read guard and run
//! concurrently; a content write takes the write guard and updates the
//! chunk, its lexical entry, and its embedding row before the guard drops.
//! That guard is the durability unit, so no reader can observe content
//! without a matching index entry.
//!
//! Access scoping is built here: every search composes the caller's
//! [`Scope`] with the `Ready`-status requirement and the optional date
//! window into one eligibility predicate that the indexes evaluate before
//! ranking.
//!
//! Dimension migration is exclusive: `begin_dimension_migration` purges all
//! chunks and flips the store into a state where every read and write fails
//! with `IndexMigrating`; `ingest_migrated_chunk` repopulates at the new
//! dimension; `finish_dimension_migration` reopens the store. There is no
//! observable window in which chunks of two dimensions coexist.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use log::{debug, info};
use quarry_core::{Chunk, DateWindow, Document, DocumentStatus, Error, Result, Scope};
use quarry_fts::{FtsConfig, LexicalIndex, LexicalQuery};
use quarry_vector::VectorIndex;
use uuid::Uuid;

use crate::matches::{KeywordMatch, SemanticMatch};

struct Inner {
    documents: HashMap<Uuid, Document>,
    chunks: HashMap<Uuid, Chunk>,
    lexical: LexicalIndex,
    vectors: VectorIndex,
    migrating: bool,
}

impl Inner {
    /// The mandatory eligibility predicate: scope, lifecycle, date window.
    fn eligibility<'a>(
        &'a self,
        scope: Scope,
        window: DateWindow,
    ) -> impl Fn(Uuid) -> bool + 'a {
        move |chunk_id| {
            let Some(chunk) = self.chunks.get(&chunk_id) else {
                return false;
            };
            let Some(document) = self.documents.get(&chunk.document_id) else {
                return false;
            };
            scope.admits(document.user_id)
                && document.status == DocumentStatus::Ready
                && window.contains(document.recency_date())
        }
    }
}

/// Thread-safe store for chunks, documents, and their derived indexes.
pub struct ChunkStore {
    inner: RwLock<Inner>,
    fts_config: FtsConfig,
}

impl ChunkStore {
    /// Create an empty store with a fixed embedding dimension.
    pub fn new(dimension: usize) -> Self {
        Self::with_config(dimension, FtsConfig::default())
    }

    /// Create an empty store with explicit lexical configuration.
    pub fn with_config(dimension: usize, fts_config: FtsConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                documents: HashMap::new(),
                chunks: HashMap::new(),
                lexical: LexicalIndex::new(),
                vectors: VectorIndex::new(dimension),
                migrating: false,
            }),
            fts_config,
        }
    }

    /// The current embedding dimension `D`.
    pub fn dimension(&self) -> usize {
        self.read_inner().vectors.dimension()
    }

    /// The lexical configuration used for ranking.
    pub fn fts_config(&self) -> &FtsConfig {
        &self.fts_config
    }

    // ------------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------------

    /// Insert or replace a document's metadata.
    pub fn upsert_document(&self, document: Document) -> Result<()> {
        let mut inner = self.write_inner();
        Self::guard_open(&inner)?;
        debug!("upsert document {}", document.id);
        inner.documents.insert(document.id, document);
        Ok(())
    }

    /// Remove a document and all of its chunks.
    pub fn remove_document(&self, document_id: Uuid) -> Result<()> {
        let mut inner = self.write_inner();
        Self::guard_open(&inner)?;

        if inner.documents.remove(&document_id).is_none() {
            return Err(Error::not_found(format!("document {document_id}")));
        }
        let orphaned: Vec<Uuid> = inner
            .chunks
            .values()
            .filter(|c| c.document_id == document_id)
            .map(|c| c.id)
            .collect();
        for chunk_id in orphaned {
            inner.chunks.remove(&chunk_id);
            inner.lexical.remove_chunk(chunk_id);
            inner.vectors.remove(chunk_id);
        }
        Ok(())
    }

    /// Fetch a document by id.
    pub fn get_document(&self, document_id: Uuid) -> Option<Document> {
        self.read_inner().documents.get(&document_id).cloned()
    }

    // ------------------------------------------------------------------------
    // Chunks
    // ------------------------------------------------------------------------

    /// Insert or replace a chunk.
    ///
    /// The chunk row, its lexical entry, and its embedding row are all
    /// written inside one critical section; the write is acknowledged only
    /// once all three are in place. Fails with `DimensionMismatch` before
    /// any state changes when the embedding length is wrong, and with
    /// `NotFound` when the owning document is missing.
    pub fn upsert_chunk(&self, chunk: Chunk) -> Result<()> {
        let mut inner = self.write_inner();
        Self::guard_open(&inner)?;
        Self::validate_chunk(&inner, &chunk)?;
        Self::apply_chunk(&mut inner, chunk);
        Ok(())
    }

    /// Remove a chunk and its index entries.
    pub fn remove_chunk(&self, chunk_id: Uuid) -> Result<()> {
        let mut inner = self.write_inner();
        Self::guard_open(&inner)?;

        if inner.chunks.remove(&chunk_id).is_none() {
            return Err(Error::not_found(format!("chunk {chunk_id}")));
        }
        inner.lexical.remove_chunk(chunk_id);
        inner.vectors.remove(chunk_id);
        Ok(())
    }

    /// Fetch a chunk by id.
    pub fn get_chunk(&self, chunk_id: Uuid) -> Option<Chunk> {
        self.read_inner().chunks.get(&chunk_id).cloned()
    }

    /// Number of stored chunks.
    pub fn chunk_count(&self) -> usize {
        self.read_inner().chunks.len()
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Semantic search: the `k` most similar eligible chunks, descending by
    /// similarity, chunk_index as tie-break.
    pub fn semantic_search(
        &self,
        embedding: &[f32],
        k: usize,
        scope: Scope,
        window: DateWindow,
    ) -> Result<Vec<SemanticMatch>> {
        let inner = self.read_inner();
        Self::guard_open(&inner)?;

        let eligible = inner.eligibility(scope, window);
        let hits = inner.vectors.search(embedding, k, &eligible)?;

        let mut matches: Vec<SemanticMatch> = hits
            .into_iter()
            .filter_map(|hit| {
                let chunk = inner.chunks.get(&hit.chunk_id)?.clone();
                let document = inner.documents.get(&chunk.document_id)?.clone();
                Some(SemanticMatch {
                    chunk,
                    document,
                    similarity: hit.similarity,
                })
            })
            .collect();
        matches.sort_by(|a, b| {
            score_order(a.similarity, b.similarity)
                .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
        });
        Ok(matches)
    }

    /// Lexical search: the `k` best-ranked eligible chunks, descending by
    /// BM25 rank, chunk_index as tie-break.
    pub fn keyword_search(
        &self,
        query: &LexicalQuery,
        k: usize,
        scope: Scope,
        window: DateWindow,
    ) -> Result<Vec<KeywordMatch>> {
        let inner = self.read_inner();
        Self::guard_open(&inner)?;

        let eligible = inner.eligibility(scope, window);
        let hits = inner.lexical.search(query, k, &self.fts_config, &eligible);

        let mut matches: Vec<KeywordMatch> = hits
            .into_iter()
            .filter_map(|hit| {
                let chunk = inner.chunks.get(&hit.chunk_id)?.clone();
                let document = inner.documents.get(&chunk.document_id)?.clone();
                Some(KeywordMatch {
                    chunk,
                    document,
                    rank: hit.rank,
                })
            })
            .collect();
        matches.sort_by(|a, b| {
            score_order(a.rank, b.rank).then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
        });
        Ok(matches)
    }

    // ------------------------------------------------------------------------
    // Dimension migration
    // ------------------------------------------------------------------------

    /// Begin an exclusive dimension migration.
    ///
    /// Purges every chunk and both indexes, resets the vector index to
    /// `new_dimension`, and rejects all reads and writes with
    /// `IndexMigrating` until [`finish_dimension_migration`] is called.
    /// Document metadata is kept; chunks must be re-ingested at the new
    /// dimension via [`ingest_migrated_chunk`].
    ///
    /// [`finish_dimension_migration`]: ChunkStore::finish_dimension_migration
    /// [`ingest_migrated_chunk`]: ChunkStore::ingest_migrated_chunk
    pub fn begin_dimension_migration(&self, new_dimension: usize) -> Result<()> {
        let mut inner = self.write_inner();
        if inner.migrating {
            return Err(Error::IndexMigrating);
        }
        info!(
            "beginning dimension migration: {} -> {} ({} chunks purged)",
            inner.vectors.dimension(),
            new_dimension,
            inner.chunks.len()
        );
        inner.chunks.clear();
        inner.lexical.clear();
        inner.vectors.reset_dimension(new_dimension);
        inner.migrating = true;
        Ok(())
    }

    /// Ingest a re-embedded chunk while a migration is in progress.
    ///
    /// This is the only write permitted during a migration; it validates
    /// against the new dimension.
    pub fn ingest_migrated_chunk(&self, chunk: Chunk) -> Result<()> {
        let mut inner = self.write_inner();
        if !inner.migrating {
            return Err(Error::invalid_data(
                "ingest_migrated_chunk outside a migration",
            ));
        }
        Self::validate_chunk(&inner, &chunk)?;
        Self::apply_chunk(&mut inner, chunk);
        Ok(())
    }

    /// Complete a migration and reopen the store.
    pub fn finish_dimension_migration(&self) -> Result<()> {
        let mut inner = self.write_inner();
        if !inner.migrating {
            return Err(Error::invalid_data("no migration in progress"));
        }
        info!(
            "dimension migration complete: {} chunks at dimension {}",
            inner.chunks.len(),
            inner.vectors.dimension()
        );
        inner.migrating = false;
        Ok(())
    }

    /// Whether a migration is in progress.
    pub fn is_migrating(&self) -> bool {
        self.read_inner().migrating
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn guard_open(inner: &Inner) -> Result<()> {
        if inner.migrating {
            return Err(Error::IndexMigrating);
        }
        Ok(())
    }

    fn validate_chunk(inner: &Inner, chunk: &Chunk) -> Result<()> {
        let expected = inner.vectors.dimension();
        if chunk.dimension() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: chunk.dimension(),
            });
        }
        if !inner.documents.contains_key(&chunk.document_id) {
            return Err(Error::not_found(format!(
                "document {} for chunk {}",
                chunk.document_id, chunk.id
            )));
        }
        Ok(())
    }

    /// Apply a validated chunk write: content plus both index entries,
    /// within the caller's write guard.
    fn apply_chunk(inner: &mut Inner, chunk: Chunk) {
        debug!("upsert chunk {} (doc {})", chunk.id, chunk.document_id);
        inner.lexical.index_chunk(chunk.id, &chunk.content);
        // Dimension was validated above; an insert failure here is unreachable.
        let _ = inner.vectors.insert(chunk.id, chunk.embedding.clone());
        inner.chunks.insert(chunk.id, chunk);
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_inner(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn score_order(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

// ============================================================================
// Tests
// ============================================================================
