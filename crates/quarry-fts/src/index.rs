//! The lexical inverted index.
//!
//! [`LexicalIndex`] maps analyzed terms to per-chunk term frequencies and
//! keeps the full token sequence of every chunk for exact phrase matching.
//! It holds no locks of its own: the owning store wraps it in its write
//! critical section so that a chunk's content and its lexical entry are
//! always updated together ("no stale index" invariant).
//!
//! Eligibility (access scope, lifecycle state, date window) is evaluated
//! while candidates are collected, before ranking and before top-k
//! truncation, so the returned `k` results are the true top-k among
//! eligible chunks and ineligible rows never influence the output.
//!
//! Ranking is BM25 over the conjunction of query clauses. Corpus statistics
//! (document frequency, average length) are computed over the whole index;
//! scores are only ever returned for rows the scope admits.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::query::{Atom, LexicalQuery};
use crate::tokenizer::tokenize;
use crate::types::FtsConfig;

/// A scored lexical match.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalHit {
    /// Matched chunk.
    pub chunk_id: Uuid,
    /// BM25 relevance score (> 0 for any match).
    pub rank: f32,
}

/// In-memory inverted index over chunk content.
#[derive(Debug, Default)]
pub struct LexicalIndex {
    /// term -> chunk -> term frequency
    postings: HashMap<String, HashMap<Uuid, u32>>,
    /// chunk -> analyzed token sequence (for phrase matching and lengths)
    sequences: HashMap<Uuid, Vec<String>>,
}

impl LexicalIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// The derived lexical terms for a chunk, if indexed.
    pub fn terms_for(&self, chunk_id: Uuid) -> Option<&[String]> {
        self.sequences.get(&chunk_id).map(Vec::as_slice)
    }

    /// (Re)index a chunk's content. Any previous entry is replaced.
    pub fn index_chunk(&mut self, chunk_id: Uuid, content: &str) {
        self.remove_chunk(chunk_id);

        let tokens = tokenize(content);
        for token in &tokens {
            *self
                .postings
                .entry(token.clone())
                .or_default()
                .entry(chunk_id)
                .or_insert(0) += 1;
        }
        self.sequences.insert(chunk_id, tokens);
    }

    /// Remove a chunk's entry entirely.
    pub fn remove_chunk(&mut self, chunk_id: Uuid) {
        let Some(tokens) = self.sequences.remove(&chunk_id) else {
            return;
        };
        let unique: HashSet<&String> = tokens.iter().collect();
        for token in unique {
            if let Some(per_chunk) = self.postings.get_mut(token) {
                per_chunk.remove(&chunk_id);
                if per_chunk.is_empty() {
                    self.postings.remove(token);
                }
            }
        }
    }

    /// Drop every entry. Used by dimension migrations.
    pub fn clear(&mut self) {
        self.postings.clear();
        self.sequences.clear();
    }

    /// Search the index for `query`, returning up to `k` hits ordered by
    /// descending rank. `eligible` is the mandatory scope predicate; chunks
    /// it rejects are excluded before ranking.
    pub fn search(
        &self,
        query: &LexicalQuery,
        k: usize,
        config: &FtsConfig,
        eligible: &dyn Fn(Uuid) -> bool,
    ) -> Vec<LexicalHit> {
        if query.is_empty() || k == 0 || self.sequences.is_empty() {
            return Vec::new();
        }

        // Per clause: the eligible chunks matching any atom, with per-atom
        // frequency and document-frequency stats kept for scoring.
        let mut candidates: Option<HashSet<Uuid>> = None;
        let mut atom_matches: Vec<(HashMap<Uuid, u32>, usize)> = Vec::new();

        for clause in &query.clauses {
            let mut clause_chunks: HashSet<Uuid> = HashSet::new();
            for atom in clause {
                let matches = self.match_atom(atom, eligible);
                let df = self.document_frequency(atom);
                clause_chunks.extend(matches.keys().copied());
                atom_matches.push((matches, df));
            }

            candidates = Some(match candidates {
                None => clause_chunks,
                Some(previous) => previous.intersection(&clause_chunks).copied().collect(),
            });

            if candidates.as_ref().is_some_and(HashSet::is_empty) {
                return Vec::new();
            }
        }

        let candidates = candidates.unwrap_or_default();
        let total = self.sequences.len() as f32;
        let avg_len = self
            .sequences
            .values()
            .map(|t| t.len() as f32)
            .sum::<f32>()
            / total;

        let mut hits: Vec<LexicalHit> = candidates
            .into_iter()
            .map(|chunk_id| {
                let len = self
                    .sequences
                    .get(&chunk_id)
                    .map(|t| t.len() as f32)
                    .unwrap_or(0.0);
                let mut rank = 0.0f32;
                for (matches, df) in &atom_matches {
                    let Some(&tf) = matches.get(&chunk_id) else {
                        continue;
                    };
                    rank += bm25_term(tf as f32, *df as f32, total, len, avg_len, config);
                }
                LexicalHit { chunk_id, rank }
            })
            .collect();

        // Deterministic order: rank descending, id as a stable fallback.
        // The store applies the chunk_index tie-break once metadata is known.
        hits.sort_by(|a, b| {
            b.rank
                .partial_cmp(&a.rank)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(k);
        hits
    }

    /// Eligible chunks matching a single atom, with match frequencies.
    fn match_atom(&self, atom: &Atom, eligible: &dyn Fn(Uuid) -> bool) -> HashMap<Uuid, u32> {
        match atom {
            Atom::Term(term) => self
                .postings
                .get(term)
                .map(|per_chunk| {
                    per_chunk
                        .iter()
                        .filter(|(id, _)| eligible(**id))
                        .map(|(id, tf)| (*id, *tf))
                        .collect()
                })
                .unwrap_or_default(),
            Atom::Phrase(tokens) => {
                // Only chunks containing every phrase term can match; scan
                // those sequences for the exact subsequence.
                let Some(candidate_ids) = self.phrase_candidates(tokens) else {
                    return HashMap::new();
                };
                candidate_ids
                    .into_iter()
                    .filter(|id| eligible(*id))
                    .filter_map(|id| {
                        let seq = self.sequences.get(&id)?;
                        let count = count_subsequence(seq, tokens);
                        (count > 0).then_some((id, count))
                    })
                    .collect()
            }
        }
    }

    /// Chunks containing all terms of a phrase (superset of true matches).
    fn phrase_candidates(&self, tokens: &[String]) -> Option<HashSet<Uuid>> {
        let mut ids: Option<HashSet<Uuid>> = None;
        for token in tokens {
            let per_chunk = self.postings.get(token)?;
            let chunk_ids: HashSet<Uuid> = per_chunk.keys().copied().collect();
            ids = Some(match ids {
                None => chunk_ids,
                Some(prev) => prev.intersection(&chunk_ids).copied().collect(),
            });
        }
        ids
    }

    /// Corpus-wide document frequency of an atom.
    fn document_frequency(&self, atom: &Atom) -> usize {
        match atom {
            Atom::Term(term) => self.postings.get(term).map(HashMap::len).unwrap_or(0),
            Atom::Phrase(tokens) => self
                .phrase_candidates(tokens)
                .map(|ids| {
                    ids.iter()
                        .filter(|id| {
                            self.sequences
                                .get(id)
                                .is_some_and(|seq| count_subsequence(seq, tokens) > 0)
                        })
                        .count()
                })
                .unwrap_or(0),
        }
    }
}

/// BM25 contribution of one matched atom.
fn bm25_term(tf: f32, df: f32, total: f32, len: f32, avg_len: f32, config: &FtsConfig) -> f32 {
    let idf = (1.0 + (total - df + 0.5) / (df + 0.5)).ln();
    let norm = if avg_len > 0.0 { len / avg_len } else { 1.0 };
    let denom = tf + config.bm25_k1 * (1.0 - config.bm25_b + config.bm25_b * norm);
    idf * tf * (config.bm25_k1 + 1.0) / denom
}

/// Count non-overlapping occurrences of `needle` as a contiguous
/// subsequence of `haystack`.
fn count_subsequence(haystack: &[String], needle: &[String]) -> u32 {
    if needle.is_empty() || haystack.len() < needle.len() {
        return 0;
    }
    let mut count = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            count += 1;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    count
}

// ============================================================================
// Tests
// ============================================================================
