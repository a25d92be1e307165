//! The semantic vector index.
//!
//! [`VectorIndex`] is an exact-scan cosine index over chunk embeddings with
//! a dimension fixed at construction. Every write is validated against that
//! dimension; a mixed-dimension index is never representable. Like the
//! lexical index, it is a passive structure: the owning store updates it
//! inside its write critical section.
//!
//! Exact scan keeps the eligibility guarantee trivial: the scope predicate
//! is applied to every row before scoring, so the returned `k` hits are the
//! true top-k among eligible chunks. An ANN backend may replace the scan
//! later as long as it preserves that contract and the dimension check.

use std::collections::HashMap;

use quarry_core::{Error, Result};
use uuid::Uuid;

use crate::similarity::cosine_similarity;

/// A scored semantic match.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticHit {
    /// Matched chunk.
    pub chunk_id: Uuid,
    /// `1 - cosine_distance` against the query embedding. In `[0, 1]` for
    /// normalized non-negative embeddings.
    pub similarity: f32,
}

/// In-memory cosine-similarity index over chunk embeddings.
#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    rows: HashMap<Uuid, Vec<f32>>,
}

impl VectorIndex {
    /// Create an empty index with a fixed embedding dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            rows: HashMap::new(),
        }
    }

    /// The index dimension `D`.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert or replace a chunk's embedding.
    ///
    /// Fails with `DimensionMismatch` when the embedding length differs
    /// from the index dimension; the index is left untouched.
    pub fn insert(&mut self, chunk_id: Uuid, embedding: Vec<f32>) -> Result<()> {
        self.check_dimension(embedding.len())?;
        self.rows.insert(chunk_id, embedding);
        Ok(())
    }

    /// Remove a chunk's embedding.
    pub fn remove(&mut self, chunk_id: Uuid) {
        self.rows.remove(&chunk_id);
    }

    /// Drop every row. Used by dimension migrations.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Reset the index to a new dimension, dropping all rows.
    ///
    /// Only the store's migration path calls this; a populated index never
    /// changes dimension in place.
    pub fn reset_dimension(&mut self, dimension: usize) {
        self.rows.clear();
        self.dimension = dimension;
    }

    /// Search for the `k` most similar eligible chunks, ordered by
    /// descending similarity.
    ///
    /// `eligible` is the mandatory scope predicate, applied before scoring
    /// and truncation. Fails with `DimensionMismatch` when the query
    /// embedding length differs from the index dimension, never silently
    /// truncated or padded.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        eligible: &dyn Fn(Uuid) -> bool,
    ) -> Result<Vec<SemanticHit>> {
        self.check_dimension(query.len())?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SemanticHit> = self
            .rows
            .iter()
            .filter(|(id, _)| eligible(**id))
            .map(|(id, embedding)| SemanticHit {
                chunk_id: *id,
                similarity: cosine_similarity(query, embedding),
            })
            .collect();

        // Deterministic order: similarity descending, id as a stable
        // fallback. The store applies the chunk_index tie-break.
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn all(_: Uuid) -> bool {
        true
    }

    fn unit(components: &[f32]) -> Vec<f32> {
        let norm: f32 = components.iter().map(|x| x * x).sum::<f32>().sqrt();
        components.iter().map(|x| x / norm).collect()
    }

    #[test]
    fn test_insert_and_search() {
        let mut index = VectorIndex::new(2);
        let close = Uuid::new_v4();
        let far = Uuid::new_v4();
        index.insert(close, unit(&[1.0, 0.1])).unwrap();
        index.insert(far, unit(&[0.1, 1.0])).unwrap();

        let hits = index.search(&unit(&[1.0, 0.0]), 10, &all).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, close);
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[test]
    fn test_similarity_in_unit_range_for_normalized() {
        let mut index = VectorIndex::new(3);
        for _ in 0..5 {
            index
                .insert(Uuid::new_v4(), unit(&[0.3, 0.5, 0.7]))
                .unwrap();
        }
        let hits = index.search(&unit(&[0.2, 0.4, 0.9]), 10, &all).unwrap();
        for hit in hits {
            assert!((0.0..=1.0).contains(&hit.similarity));
        }
    }

    #[test]
    fn test_ordering_non_increasing() {
        let mut index = VectorIndex::new(4);
        for i in 0..20 {
            let x = i as f32 / 20.0;
            index
                .insert(Uuid::new_v4(), unit(&[1.0, x, x * x, 0.5]))
                .unwrap();
        }
        let hits = index.search(&unit(&[1.0, 0.0, 0.0, 0.0]), 20, &all).unwrap();
        for pair in hits.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn test_insert_dimension_mismatch() {
        let mut index = VectorIndex::new(4);
        let err = index.insert(Uuid::new_v4(), vec![0.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            quarry_core::Error::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let mut index = VectorIndex::new(4);
        index.insert(Uuid::new_v4(), vec![0.5; 4]).unwrap();

        let err = index.search(&[0.5; 3], 10, &all).unwrap_err();
        assert!(matches!(
            err,
            quarry_core::Error::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_eligibility_applied_before_truncation() {
        let mut index = VectorIndex::new(2);
        // Ineligible rows are perfect matches; they must not consume the
        // k window.
        for _ in 0..5 {
            index.insert(Uuid::new_v4(), unit(&[1.0, 0.0])).unwrap();
        }
        let visible = Uuid::new_v4();
        index.insert(visible, unit(&[0.5, 0.5])).unwrap();

        let hits = index
            .search(&unit(&[1.0, 0.0]), 3, &|id| id == visible)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, visible);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut index = VectorIndex::new(2);
        let id = Uuid::new_v4();
        index.insert(id, vec![1.0, 0.0]).unwrap();
        index.remove(id);
        assert!(index.is_empty());

        index.insert(Uuid::new_v4(), vec![1.0, 0.0]).unwrap();
        index.clear();
        assert!(index.is_empty());
    }

    #[test]
    fn test_reset_dimension() {
        let mut index = VectorIndex::new(2);
        index.insert(Uuid::new_v4(), vec![1.0, 0.0]).unwrap();
        index.reset_dimension(3);
        assert!(index.is_empty());
        assert_eq!(index.dimension(), 3);
        index.insert(Uuid::new_v4(), vec![1.0, 0.0, 0.0]).unwrap();
    }

    #[test]
    fn test_replace_embedding() {
        let mut index = VectorIndex::new(2);
        let id = Uuid::new_v4();
        index.insert(id, unit(&[1.0, 0.0])).unwrap();
        index.insert(id, unit(&[0.0, 1.0])).unwrap();
        assert_eq!(index.len(), 1);

        let hits = index.search(&unit(&[0.0, 1.0]), 1, &all).unwrap();
        assert!((hits[0].similarity - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_search_respects_limit() {
        let mut index = VectorIndex::new(2);
        for _ in 0..10 {
            index.insert(Uuid::new_v4(), unit(&[0.6, 0.8])).unwrap();
        }
        let hits = index.search(&unit(&[1.0, 0.0]), 4, &all).unwrap();
        assert_eq!(hits.len(), 4);
    }
}
