//! Vector index abstraction for document chunks.
//!
//! Defines a trait for backend-agnostic vector storage and nearest-neighbour
//! search.

use crate::types::{DocumentChunk, ScoredChunk};
use docchat_core::AppResult;

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Appending embedded chunks
/// - Nearest-neighbour search returning chunks with their embeddings
/// - Counting entries
/// - Clearing the collection
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Collection (table) name.
    fn collection(&self) -> &str;

    /// Append chunks; every chunk must carry an embedding.
    async fn add_chunks(&self, chunks: &[DocumentChunk]) -> AppResult<()>;

    /// The `limit` entries closest to `query_embedding`, most similar first.
    ///
    /// Returned chunks carry their stored embedding.
    async fn nearest(&self, query_embedding: &[f32], limit: usize) -> AppResult<Vec<ScoredChunk>>;

    /// Number of stored chunks.
    async fn count(&self) -> AppResult<u64>;

    /// Remove every chunk.
    async fn reset(&self) -> AppResult<()>;
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort by descending score, ties keep their order.
pub(crate) fn sort_by_score(results: &mut [ScoredChunk]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[2.0, 0.0], &[5.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
