//! Embedding generation for document collections.
//!
//! Provides provider-agnostic embedding with per-collection configuration.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::{known_dimensions, EmbeddingConfig};
pub use provider::{create_provider, EmbeddingProvider};

use docchat_core::{AppError, AppResult};

/// Embed `texts` in slices of at most `batch_size`, preserving order.
///
/// `on_batch` receives the number of texts embedded so far after each slice.
pub async fn embed_in_batches<F>(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
    mut on_batch: F,
) -> AppResult<Vec<Vec<f32>>>
where
    F: FnMut(usize) + Send,
{
    let mut embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = provider.embed_batch(batch).await?;
        if vectors.len() != batch.len() {
            return Err(AppError::Knowledge(format!(
                "Provider '{}' returned {} embeddings for {} texts",
                provider.provider_name(),
                vectors.len(),
                batch.len()
            )));
        }
        embeddings.extend(vectors);
        on_batch(embeddings.len());
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        embeddings.len(),
        provider.dimensions()
    );

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::MockProvider;

    #[derive(Debug)]
    struct ShortProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ShortProvider {
        fn provider_name(&self) -> &str {
            "short"
        }

        fn model_name(&self) -> &str {
            "short"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0]])
        }
    }

    #[tokio::test]
    async fn test_batches_preserve_order() {
        let provider = MockProvider::new(64);
        let texts: Vec<String> = (0..7).map(|i| format!("clause number {}", i)).collect();

        let mut seen = Vec::new();
        let batched = embed_in_batches(&provider, &texts, 3, |done| seen.push(done))
            .await
            .unwrap();
        let whole = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(batched, whole);
        assert_eq!(seen, vec![3, 6, 7]);
    }

    #[tokio::test]
    async fn test_count_mismatch_is_error() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = embed_in_batches(&ShortProvider, &texts, 10, |_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("returned 1 embeddings for 2 texts"));
    }
}
