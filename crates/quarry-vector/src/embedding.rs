//! Embedding provider seam.
//!
//! Queries arrive with a caller-supplied vector, so the index never embeds
//! anything itself. Ingestion-side callers and tests still need a source of
//! vectors at the store's dimension; [`EmbeddingProvider`] is that seam, and
//! [`MockEmbeddingProvider`] is its deterministic in-process implementation.

use async_trait::async_trait;
use quarry_core::Result;

/// Produces embeddings at a fixed dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch. The default delegates to [`embed`](Self::embed) one
    /// text at a time; backends with native batching override it.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;
}

/// Deterministic provider for tests and offline fixtures.
///
/// Each text seeds an xorshift stream via FNV-1a, so equal texts always map
/// to the same unit vector and distinct texts diverge. No model, no I/O.
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn seed(text: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in text.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        // xorshift needs a nonzero state.
        hash.max(1)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut state = Self::seed(text);
        let mut vector: Vec<f32> = (0..self.dimension)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 40) as f32 / (1u32 << 24) as f32
            })
            .collect();

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for component in &mut vector {
                *component /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Tests
// ============================================================================
