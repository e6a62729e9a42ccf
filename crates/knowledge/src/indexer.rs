//! PDF indexing into a vector collection.
//!
//! The collection is written in a single add once every chunk is embedded,
//! so a non-empty collection always holds a finished run.

use crate::chunker::Chunker;
use crate::embeddings::{embed_in_batches, EmbeddingProvider};
use crate::loader::{discover_pdfs, load_pdf_pages};
use crate::progress::ProgressReporter;
use crate::types::{DocumentChunk, IndexOptions, IndexOutcome, IndexStats};
use crate::vector_index::VectorIndex;
use chrono::Utc;
use docchat_core::AppResult;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Loads, chunks, embeds and stores PDFs.
pub struct KnowledgeIndexer {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    /// Serialises the count check with the run it guards
    gate: Mutex<()>,
    progress: ProgressReporter,
    batch_size: usize,
}

impl KnowledgeIndexer {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index,
            embedder,
            gate: Mutex::new(()),
            progress: ProgressReporter::noop(),
            batch_size: 64,
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Index the corpus unless the collection already holds data.
    ///
    /// If the collection cannot be counted, data is assumed present and
    /// [`IndexOutcome::Unverified`] is returned.
    pub async fn ensure_indexed_once(&self, options: &IndexOptions) -> AppResult<IndexOutcome> {
        let _guard = self.gate.lock().await;

        match self.index.count().await {
            Ok(0) => {
                tracing::info!(
                    "Collection '{}' is empty, indexing {:?}",
                    self.index.collection(),
                    options.source_dir
                );
                Ok(IndexOutcome::Indexed(self.run(options).await?))
            }
            Ok(existing) => {
                tracing::info!(
                    "Collection '{}' already holds {} chunks, skipping indexing",
                    self.index.collection(),
                    existing
                );
                Ok(IndexOutcome::Skipped { existing })
            }
            Err(e) => {
                tracing::warn!(
                    "Could not count collection '{}' ({}), assuming it is already indexed",
                    self.index.collection(),
                    e
                );
                Ok(IndexOutcome::Unverified {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Index the corpus regardless of what the collection holds.
    pub async fn index_pdfs(&self, options: &IndexOptions) -> AppResult<IndexStats> {
        let _guard = self.gate.lock().await;
        self.run(options).await
    }

    #[tracing::instrument(skip(self, options), fields(collection = %self.index.collection()))]
    async fn run(&self, options: &IndexOptions) -> AppResult<IndexStats> {
        let start = Instant::now();
        let chunker = Chunker::new(options.chunk_size, options.chunk_overlap)?;
        let mut stats = IndexStats::default();

        let pdfs = discover_pdfs(&options.source_dir);
        self.progress
            .discover(pdfs.len() as u64, &options.source_dir.display().to_string());

        if pdfs.is_empty() {
            tracing::warn!("No PDF files found in {:?}", options.source_dir);
            stats.duration_secs = start.elapsed().as_secs_f64();
            return Ok(stats);
        }

        let indexed_at = Utc::now();
        let total = pdfs.len() as u64;
        let mut chunks: Vec<DocumentChunk> = Vec::new();

        for (i, path) in pdfs.iter().enumerate() {
            let current = i as u64 + 1;
            self.progress.parse(current, total, &path.display().to_string());

            let pages = match load_pdf_pages(path) {
                Ok(pages) => pages,
                Err(e) => {
                    tracing::warn!("Skipping unreadable PDF {:?}: {}", path, e);
                    stats.skipped_files += 1;
                    continue;
                }
            };

            if pages.is_empty() {
                tracing::warn!("Skipping {:?}: no extractable text", path);
                stats.skipped_files += 1;
                continue;
            }

            let document_chunks = chunker.split_document(&pages, indexed_at);
            tracing::debug!(
                "{:?}: {} pages, {} chunks",
                path,
                pages.len(),
                document_chunks.len()
            );

            stats.documents += 1;
            stats.pages += pages.len() as u32;
            stats.sources.push(path.display().to_string());
            chunks.extend(document_chunks);

            self.progress.chunk(current, total, chunks.len());
        }

        self.embed_chunks(&mut chunks).await?;

        let total_chunks = chunks.len() as u64;
        self.index.add_chunks(&chunks).await?;
        self.progress
            .index(total_chunks, total_chunks, self.index.collection());

        stats.chunks = chunks.len() as u32;
        stats.duration_secs = start.elapsed().as_secs_f64();

        tracing::info!(
            "Indexed {} documents ({} pages, {} chunks, {} skipped) in {:.2}s",
            stats.documents,
            stats.pages,
            stats.chunks,
            stats.skipped_files,
            stats.duration_secs
        );

        Ok(stats)
    }

    async fn embed_chunks(&self, chunks: &mut [DocumentChunk]) -> AppResult<()> {
        let total = chunks.len() as u64;
        let model = self.embedder.model_name();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let vectors = embed_in_batches(self.embedder.as_ref(), &texts, self.batch_size, |done| {
            self.progress.embed(done as u64, total, model)
        })
        .await?;

        for (chunk, vector) in chunks.iter_mut().zip(vectors) {
            chunk.embedding = Some(vector);
        }

        Ok(())
    }
}
