//! Score fusion: recency weighting and reciprocal rank fusion.
//!
//! # Recency weighting
//!
//! `final = (1 - w) * similarity + w * recency`, where
//! `recency = exp(-decay_rate * age_in_years)` so a document dated today
//! scores 1.0 and older documents decay toward 0. With `w = 0` the
//! similarity passes through bit-for-bit. A result with no recency date
//! keeps its similarity unchanged; undated documents are not penalized.
//!
//! # Reciprocal rank fusion
//!
//! RRF score for chunk `d`: `score(d) = Σ 1/(k + rank_i(d))` over the lists
//! `d` appears in, with 1-based ranks. Being rank-based, RRF is indifferent
//! to the incompatible scales of cosine similarity and BM25 rank, so it is
//! the one sanctioned way to merge the two lists, and only when the caller
//! asks for it explicitly.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default exponential decay rate, in 1/years.
pub const DEFAULT_RECENCY_DECAY_RATE: f32 = 0.1;

/// Default RRF constant.
pub const DEFAULT_RRF_K: u32 = 60;

/// Recency score of a document dated `date`, as of `as_of`: 1.0 for today,
/// decaying exponentially with age. Future dates clamp to 1.0.
pub fn recency_score(date: NaiveDate, as_of: NaiveDate, decay_rate: f32) -> f32 {
    let age_days = (as_of - date).num_days().max(0) as f32;
    let age_years = age_days / 365.25;
    (-decay_rate * age_years).exp()
}

/// Blend a similarity score with recency.
///
/// `recency_date` of `None` or `weight` of zero leaves the similarity
/// untouched. `weight` is clamped to `[0, 1]`.
pub fn fuse_recency(
    similarity: f32,
    recency_date: Option<NaiveDate>,
    as_of: NaiveDate,
    weight: f32,
    decay_rate: f32,
) -> f32 {
    let weight = weight.clamp(0.0, 1.0);
    if weight == 0.0 {
        return similarity;
    }
    let Some(date) = recency_date else {
        return similarity;
    };
    (1.0 - weight) * similarity + weight * recency_score(date, as_of, decay_rate)
}

/// Where an RRF-merged result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RrfSource {
    Semantic,
    Keyword,
    Hybrid,
}

/// A result of merging semantic and keyword lists with RRF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RrfHit {
    /// Chunk identifier.
    pub chunk_id: Uuid,
    /// Combined RRF score (higher is better).
    pub score: f32,
    /// Which list(s) the chunk appeared in.
    pub source: RrfSource,
}

/// Merge two ranked id lists using Reciprocal Rank Fusion.
///
/// Chunks appearing in both lists naturally score higher and are marked
/// `Hybrid`. Ties order by chunk id for determinism.
pub fn reciprocal_rank_fusion(
    semantic_ids: &[Uuid],
    keyword_ids: &[Uuid],
    limit: usize,
    k: u32,
) -> Vec<RrfHit> {
    let mut scores: HashMap<Uuid, f32> = HashMap::new();
    let mut sources: HashMap<Uuid, (bool, bool)> = HashMap::new();

    for (rank, id) in semantic_ids.iter().enumerate() {
        *scores.entry(*id).or_insert(0.0) += 1.0 / (k as f32 + (rank + 1) as f32);
        sources.entry(*id).or_insert((false, false)).0 = true;
    }
    for (rank, id) in keyword_ids.iter().enumerate() {
        *scores.entry(*id).or_insert(0.0) += 1.0 / (k as f32 + (rank + 1) as f32);
        sources.entry(*id).or_insert((false, false)).1 = true;
    }

    let mut hits: Vec<RrfHit> = scores
        .into_iter()
        .map(|(chunk_id, score)| {
            let source = match sources.get(&chunk_id).copied().unwrap_or((false, false)) {
                (true, true) => RrfSource::Hybrid,
                (true, false) => RrfSource::Semantic,
                _ => RrfSource::Keyword,
            };
            RrfHit {
                chunk_id,
                score,
                source,
            }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    hits.truncate(limit);
    hits
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (2000i32..2026, 1u32..13, 1u32..29)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    proptest! {
        #[test]
        fn fused_score_is_a_convex_combination(
            similarity in 0.0f32..=1.0,
            weight in 0.0f32..=1.0,
            doc_date in arb_date(),
        ) {
            let as_of = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
            let recency = recency_score(doc_date, as_of, DEFAULT_RECENCY_DECAY_RATE);
            let fused = fuse_recency(
                similarity,
                Some(doc_date),
                as_of,
                weight,
                DEFAULT_RECENCY_DECAY_RATE,
            );

            let lo = similarity.min(recency) - 1e-5;
            let hi = similarity.max(recency) + 1e-5;
            prop_assert!(fused >= lo && fused <= hi);
        }

        #[test]
        fn recency_score_is_monotone_in_age(
            earlier in arb_date(),
            later in arb_date(),
        ) {
            let as_of = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
            let (earlier, later) = if earlier <= later {
                (earlier, later)
            } else {
                (later, earlier)
            };
            prop_assert!(
                recency_score(earlier, as_of, DEFAULT_RECENCY_DECAY_RATE)
                    <= recency_score(later, as_of, DEFAULT_RECENCY_DECAY_RATE)
            );
        }

        #[test]
        fn zero_weight_never_changes_similarity(
            similarity in 0.0f32..=1.0,
            doc_date in arb_date(),
        ) {
            let as_of = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
            let fused = fuse_recency(
                similarity,
                Some(doc_date),
                as_of,
                0.0,
                DEFAULT_RECENCY_DECAY_RATE,
            );
            prop_assert_eq!(fused, similarity);
        }
    }
}
