//! In-memory vector index using brute-force cosine similarity.

use crate::types::{DocumentChunk, ScoredChunk};
use crate::vector_index::{cosine_similarity, sort_by_score, VectorIndex};
use docchat_core::{AppError, AppResult};
use tokio::sync::RwLock;

/// Non-persistent index for tests and throwaway sessions.
#[derive(Debug)]
pub struct InMemoryIndex {
    collection: String,
    chunks: RwLock<Vec<DocumentChunk>>,
}

impl InMemoryIndex {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            chunks: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl VectorIndex for InMemoryIndex {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn add_chunks(&self, chunks: &[DocumentChunk]) -> AppResult<()> {
        if let Some(missing) = chunks.iter().find(|c| c.embedding.is_none()) {
            return Err(AppError::Knowledge(format!(
                "Chunk {} missing embedding",
                missing.id
            )));
        }

        self.chunks.write().await.extend_from_slice(chunks);
        Ok(())
    }

    async fn nearest(&self, query_embedding: &[f32], limit: usize) -> AppResult<Vec<ScoredChunk>> {
        let chunks = self.chunks.read().await;

        let mut results: Vec<ScoredChunk> = chunks
            .iter()
            .map(|chunk| ScoredChunk {
                score: chunk
                    .embedding
                    .as_deref()
                    .map(|e| cosine_similarity(query_embedding, e))
                    .unwrap_or(0.0),
                chunk: chunk.clone(),
            })
            .collect();

        sort_by_score(&mut results);
        results.truncate(limit);
        Ok(results)
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.chunks.read().await.len() as u64)
    }

    async fn reset(&self) -> AppResult<()> {
        self.chunks.write().await.clear();
        Ok(())
    }
}
