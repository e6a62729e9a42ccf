//! Document collections for retrieval-augmented chat.
//!
//! PDFs are split into page-attributed chunks, embedded, and stored in a
//! LanceDB table; questions are answered from chunks selected with MMR.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod indexer;
pub mod lancedb_index;
pub mod loader;
pub mod memory_index;
pub mod progress;
pub mod retriever;
pub mod types;
pub mod vector_index;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use embeddings::{create_provider, known_dimensions, EmbeddingConfig, EmbeddingProvider};
pub use indexer::KnowledgeIndexer;
pub use lancedb_index::LanceDbIndex;
pub use memory_index::InMemoryIndex;
pub use progress::{ProgressCallback, ProgressEvent, ProgressPhase, ProgressReporter};
pub use retriever::{maximal_marginal_relevance, MmrRetriever};
pub use types::{
    CollectionStats, DocumentChunk, IndexManifest, IndexOptions, IndexOutcome, IndexStats,
    KnowledgeBaseConfig, RetrievalParams, ScoredChunk,
};
pub use vector_index::{cosine_similarity, VectorIndex};

use chrono::Utc;
use docchat_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A collection wired to its vector table and embedding provider.
pub struct KnowledgeBase {
    workspace: PathBuf,
    config: KnowledgeBaseConfig,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    indexer: KnowledgeIndexer,
}

impl KnowledgeBase {
    /// Open the LanceDB-backed collection described by `config`.
    ///
    /// Fails if the collection was last indexed with different embedding
    /// settings, since mixed vectors cannot be compared.
    pub async fn open(
        workspace: &Path,
        config: KnowledgeBaseConfig,
        api_key: Option<&str>,
    ) -> AppResult<Self> {
        config::validate_config(&config)?;

        let embedding = EmbeddingConfig::from(&config);
        if let Some(previous) = config::load_manifest(workspace, &config.name)?
            .and_then(|manifest| manifest.embedding)
        {
            previous.validate_consistency(&embedding).map_err(|e| {
                AppError::Knowledge(format!(
                    "Collection '{}' was indexed with other embedding settings ({}). \
                     Run 'docchat knowledge clean' before re-indexing.",
                    config.name, e
                ))
            })?;
        }

        let embedder = create_provider(&embedding, api_key).await?;
        let persist_dir = config::get_persist_dir(workspace, &config);
        let index = LanceDbIndex::open(&persist_dir, &config.name, embedding.dimensions).await?;

        tracing::info!(
            "Opened collection '{}' at {:?} (embeddings: {}/{})",
            config.name,
            persist_dir,
            embedder.provider_name(),
            embedder.model_name()
        );

        Ok(Self::from_parts(workspace, config, Arc::new(index), embedder))
    }

    /// Assemble a knowledge base from existing components.
    pub fn from_parts(
        workspace: &Path,
        config: KnowledgeBaseConfig,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let indexer = KnowledgeIndexer::new(index.clone(), embedder.clone())
            .with_batch_size(config.batch_size);

        Self {
            workspace: workspace.to_path_buf(),
            config,
            index,
            embedder,
            indexer,
        }
    }

    /// Report indexing progress through `progress`.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.indexer = KnowledgeIndexer::new(self.index.clone(), self.embedder.clone())
            .with_batch_size(self.config.batch_size)
            .with_progress(progress);
        self
    }

    pub fn config(&self) -> &KnowledgeBaseConfig {
        &self.config
    }

    pub fn index(&self) -> Arc<dyn VectorIndex> {
        self.index.clone()
    }

    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        self.embedder.clone()
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions::from_config(
            &self.config,
            config::get_source_dir(&self.workspace, &self.config),
        )
    }

    /// MMR retriever using the collection's retrieval parameters.
    pub fn retriever(&self) -> MmrRetriever {
        MmrRetriever::new(
            self.index.clone(),
            self.embedder.clone(),
            self.config.retrieval,
        )
    }

    /// Index the source directory unless the collection holds data.
    pub async fn ensure_indexed(&self) -> AppResult<IndexOutcome> {
        let outcome = self.indexer.ensure_indexed_once(&self.index_options()).await?;
        if let IndexOutcome::Indexed(ref stats) = outcome {
            self.record_run(stats)?;
        }
        Ok(outcome)
    }

    /// Clear the collection and index the source directory again.
    ///
    /// A failure after the reset leaves the collection empty; the next
    /// [`ensure_indexed`](Self::ensure_indexed) rebuilds it.
    pub async fn reindex(&self) -> AppResult<IndexStats> {
        self.index.reset().await?;
        config::remove_manifest(&self.workspace, &self.config.name)?;

        let stats = self
            .indexer
            .index_pdfs(&self.index_options())
            .await
            .map_err(|e| {
                AppError::Knowledge(format!(
                    "Re-indexing '{}' failed after the collection was cleared; it is empty \
                     and will be rebuilt on the next start: {}",
                    self.config.name, e
                ))
            })?;
        self.record_run(&stats)?;
        Ok(stats)
    }

    fn record_run(&self, stats: &IndexStats) -> AppResult<()> {
        if stats.chunks == 0 {
            return Ok(());
        }

        config::save_manifest(
            &self.workspace,
            &IndexManifest {
                collection: self.config.name.clone(),
                sources: stats.sources.clone(),
                documents: stats.documents,
                chunks: stats.chunks,
                indexed_at: Utc::now(),
                embedding: Some(EmbeddingConfig::from(&self.config)),
            },
        )
    }
}

/// Statistics for a collection, without creating it.
pub async fn stats(workspace: &Path, config: &KnowledgeBaseConfig) -> AppResult<CollectionStats> {
    tracing::info!("Getting stats for collection '{}'", config.name);

    let persist_dir = config::get_persist_dir(workspace, config);
    let chunks_count = if LanceDbIndex::exists(&persist_dir, &config.name) {
        LanceDbIndex::open(&persist_dir, &config.name, config.embedding_dim as usize)
            .await?
            .count()
            .await?
    } else {
        0
    };

    let manifest = config::load_manifest(workspace, &config.name)?;

    Ok(CollectionStats {
        collection: config.name.clone(),
        chunks_count,
        sources_count: manifest.as_ref().map(|m| m.documents).unwrap_or(0),
        last_indexed_at: manifest.map(|m| m.indexed_at),
    })
}

/// Remove every chunk of a collection. Returns `false` if it never existed.
pub async fn clean(workspace: &Path, config: &KnowledgeBaseConfig) -> AppResult<bool> {
    tracing::info!("Cleaning collection '{}'", config.name);

    let persist_dir = config::get_persist_dir(workspace, config);
    if !LanceDbIndex::exists(&persist_dir, &config.name) {
        config::remove_manifest(workspace, &config.name)?;
        return Ok(false);
    }

    LanceDbIndex::open(&persist_dir, &config.name, config.embedding_dim as usize)
        .await?
        .reset()
        .await?;
    config::remove_manifest(workspace, &config.name)?;

    tracing::info!("Collection '{}' cleaned", config.name);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::MockProvider;
    use crate::fixtures::write_pdf;
    use tempfile::TempDir;

    fn mock_config() -> KnowledgeBaseConfig {
        KnowledgeBaseConfig {
            name: "housing".to_string(),
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            embedding_dim: 64,
            ..Default::default()
        }
    }

    fn write_corpus(workspace: &Path) {
        let docs = workspace.join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        write_pdf(
            &docs.join("notice.pdf"),
            &[
                "Applications open on March 3.",
                "The deposit deadline is April 30.",
            ],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_open_index_and_stats() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());

        let before = stats(temp.path(), &mock_config()).await.unwrap();
        assert_eq!(before.chunks_count, 0);
        assert!(before.last_indexed_at.is_none());

        let kb = KnowledgeBase::open(temp.path(), mock_config(), None)
            .await
            .unwrap();
        let outcome = kb.ensure_indexed().await.unwrap();
        assert!(matches!(outcome, IndexOutcome::Indexed(ref s) if s.documents == 1));

        let after = stats(temp.path(), &mock_config()).await.unwrap();
        assert!(after.chunks_count >= 2);
        assert_eq!(after.sources_count, 1);
        assert!(after.last_indexed_at.is_some());

        // A second process sees the persisted collection and skips
        drop(kb);
        let reopened = KnowledgeBase::open(temp.path(), mock_config(), None)
            .await
            .unwrap();
        assert_eq!(
            reopened.ensure_indexed().await.unwrap(),
            IndexOutcome::Skipped {
                existing: after.chunks_count
            }
        );
    }

    #[derive(Debug)]
    struct OfflineEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for OfflineEmbedder {
        fn provider_name(&self) -> &str {
            "offline"
        }

        fn model_name(&self) -> &str {
            "offline"
        }

        fn dimensions(&self) -> usize {
            64
        }

        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Err(AppError::Knowledge("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_reindex_explains_empty_collection() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());

        let index = Arc::new(InMemoryIndex::new("housing"));
        KnowledgeBase::from_parts(
            temp.path(),
            mock_config(),
            index.clone(),
            Arc::new(MockProvider::new(64)),
        )
        .ensure_indexed()
        .await
        .unwrap();
        assert!(index.count().await.unwrap() > 0);

        let kb = KnowledgeBase::from_parts(
            temp.path(),
            mock_config(),
            index.clone(),
            Arc::new(OfflineEmbedder),
        );
        let err = kb.reindex().await.unwrap_err().to_string();
        assert!(err.contains("rebuilt on the next start"));
        assert!(err.contains("connection refused"));
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clean_resets_collection() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());

        assert!(!clean(temp.path(), &mock_config()).await.unwrap());

        let kb = KnowledgeBase::open(temp.path(), mock_config(), None)
            .await
            .unwrap();
        kb.ensure_indexed().await.unwrap();

        assert!(clean(temp.path(), &mock_config()).await.unwrap());
        let after = stats(temp.path(), &mock_config()).await.unwrap();
        assert_eq!(after.chunks_count, 0);
        assert!(after.last_indexed_at.is_none());
    }

    #[tokio::test]
    async fn test_reindex_replaces_contents() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());

        let kb = KnowledgeBase::from_parts(
            temp.path(),
            mock_config(),
            Arc::new(InMemoryIndex::new("housing")),
            Arc::new(MockProvider::new(64)),
        );

        let first = kb.reindex().await.unwrap();
        let second = kb.reindex().await.unwrap();
        assert_eq!(first.chunks, second.chunks);
        assert_eq!(kb.index().count().await.unwrap(), second.chunks as u64);
    }

    #[tokio::test]
    async fn test_embedding_change_is_rejected() {
        let temp = TempDir::new().unwrap();
        write_corpus(temp.path());

        let kb = KnowledgeBase::open(temp.path(), mock_config(), None)
            .await
            .unwrap();
        kb.ensure_indexed().await.unwrap();

        let changed = KnowledgeBaseConfig {
            embedding_dim: 128,
            ..mock_config()
        };
        let err = KnowledgeBase::open(temp.path(), changed, None)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("other embedding settings"));
    }

    #[tokio::test]
    async fn test_retriever_uses_collection_params() {
        let temp = TempDir::new().unwrap();
        let config = KnowledgeBaseConfig {
            retrieval: RetrievalParams {
                k: 2,
                fetch_k: 5,
                lambda_mult: 0.5,
            },
            ..mock_config()
        };

        let kb = KnowledgeBase::from_parts(
            temp.path(),
            config,
            Arc::new(InMemoryIndex::new("housing")),
            Arc::new(MockProvider::new(64)),
        );
        assert_eq!(kb.retriever().params().k, 2);
        assert_eq!(
            kb.index_options().source_dir,
            temp.path().join("docs")
        );
    }
}
