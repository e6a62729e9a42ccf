//! Diversity-aware retrieval with Maximal Marginal Relevance.

use crate::embeddings::EmbeddingProvider;
use crate::types::{DocumentChunk, RetrievalParams, ScoredChunk};
use crate::vector_index::{cosine_similarity, VectorIndex};
use docchat_core::AppResult;
use std::sync::Arc;

/// Pick up to `k` candidate indices balancing relevance and novelty.
///
/// The most similar candidate is taken first. Each further pick maximises
/// `lambda * sim(query, c) - (1 - lambda) * max(sim(c, selected))`.
/// Ties go to the earlier candidate.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[Vec<f32>],
    lambda_mult: f32,
    k: usize,
) -> Vec<usize> {
    let limit = k.min(candidates.len());
    if limit == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut selected: Vec<usize> = Vec::with_capacity(limit);
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while selected.len() < limit {
        let mut best: Option<(usize, f32)> = None;

        for (slot, &candidate) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|&s| cosine_similarity(&candidates[candidate], &candidates[s]))
                .fold(None, |acc: Option<f32>, sim| Some(acc.map_or(sim, |a| a.max(sim))))
                .unwrap_or(0.0);

            let score = if selected.is_empty() {
                relevance[candidate]
            } else {
                lambda_mult * relevance[candidate] - (1.0 - lambda_mult) * redundancy
            };

            if best.map_or(true, |(_, top)| score > top) {
                best = Some((slot, score));
            }
        }

        match best {
            Some((slot, _)) => selected.push(remaining.remove(slot)),
            None => break,
        }
    }

    selected
}

/// Embeds a query and selects chunks from the collection with MMR.
pub struct MmrRetriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    params: RetrievalParams,
}

impl MmrRetriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        params: RetrievalParams,
    ) -> Self {
        Self {
            index,
            embedder,
            params,
        }
    }

    pub fn params(&self) -> &RetrievalParams {
        &self.params
    }

    /// Up to `k` chunks, in MMR selection order.
    pub async fn retrieve(&self, query: &str) -> AppResult<Vec<DocumentChunk>> {
        Ok(self
            .retrieve_scored(query)
            .await?
            .into_iter()
            .map(|scored| scored.chunk)
            .collect())
    }

    /// Like [`retrieve`](Self::retrieve), keeping each chunk's similarity to
    /// the query.
    #[tracing::instrument(skip(self), fields(collection = %self.index.collection()))]
    pub async fn retrieve_scored(&self, query: &str) -> AppResult<Vec<ScoredChunk>> {
        let fetch_k = self.params.effective_fetch_k();
        let query_embedding = self.embedder.embed(query).await?;

        let candidates = self.index.nearest(&query_embedding, fetch_k).await?;
        tracing::debug!(
            "Considering {} candidates (fetch_k={}, k={}, lambda={})",
            candidates.len(),
            fetch_k,
            self.params.k,
            self.params.lambda_mult
        );

        let vectors: Vec<Vec<f32>> = candidates
            .iter()
            .map(|c| c.chunk.embedding.clone().unwrap_or_default())
            .collect();
        let order = maximal_marginal_relevance(
            &query_embedding,
            &vectors,
            self.params.lambda_mult,
            self.params.k,
        );

        let mut slots: Vec<Option<ScoredChunk>> = candidates.into_iter().map(Some).collect();
        let selected: Vec<ScoredChunk> = order
            .into_iter()
            .filter_map(|i| slots.get_mut(i).and_then(Option::take))
            .collect();

        tracing::info!("Retrieved {} chunks", selected.len());
        Ok(selected)
    }
}
