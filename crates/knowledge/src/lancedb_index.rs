//! LanceDB-backed vector index implementation.

use crate::types::{DocumentChunk, ScoredChunk};
use crate::vector_index::{cosine_similarity, sort_by_score, VectorIndex};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array,
};
use arrow_schema::{DataType, Field, Schema};
use docchat_core::{AppError, AppResult};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::path::Path;
use std::sync::Arc;

/// LanceDB-backed vector index; one table per collection.
pub struct LanceDbIndex {
    table: Table,
    collection: String,
    embedding_dim: usize,
}

impl LanceDbIndex {
    /// Create or open the table for `collection` under `db_path`.
    ///
    /// # Arguments
    /// * `db_path` - Directory holding the LanceDB database
    /// * `collection` - Table name
    /// * `embedding_dim` - Dimension of embedding vectors (e.g., 3072)
    pub async fn open(db_path: &Path, collection: &str, embedding_dim: usize) -> AppResult<Self> {
        std::fs::create_dir_all(db_path).map_err(|e| {
            AppError::Knowledge(format!("Failed to create index directory: {}", e))
        })?;

        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to connect to LanceDB: {}", e)))?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to list tables: {}", e)))?;

        let table = if table_names.iter().any(|name| name == collection) {
            conn.open_table(collection)
                .execute()
                .await
                .map_err(|e| AppError::Knowledge(format!("Failed to open table: {}", e)))?
        } else {
            let schema = Self::create_schema(embedding_dim);
            let empty_batch = RecordBatch::new_empty(schema.clone());

            conn.create_table(
                collection,
                RecordBatchIterator::new(vec![Ok(empty_batch)], schema),
            )
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to create table: {}", e)))?
        };

        tracing::debug!("Opened LanceDB table '{}' at {:?}", collection, db_path);

        Ok(Self {
            table,
            collection: collection.to_string(),
            embedding_dim,
        })
    }

    /// Whether a table for `collection` has been created under `db_path`.
    pub fn exists(db_path: &Path, collection: &str) -> bool {
        db_path.join(format!("{}.lance", collection)).exists()
    }

    fn create_schema(embedding_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("page", DataType::UInt32, false),
            Field::new("position", DataType::UInt32, false),
            Field::new("text", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    embedding_dim as i32,
                ),
                false,
            ),
            Field::new("metadata", DataType::Utf8, false),
        ]))
    }

    /// Convert chunks to one Arrow RecordBatch.
    fn chunks_to_batch(&self, chunks: &[DocumentChunk]) -> AppResult<RecordBatch> {
        let mut values = Vec::with_capacity(chunks.len() * self.embedding_dim);
        let mut metadata = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let embedding = chunk.embedding.as_ref().ok_or_else(|| {
                AppError::Knowledge(format!("Chunk {} missing embedding", chunk.id))
            })?;

            if embedding.len() != self.embedding_dim {
                return Err(AppError::Knowledge(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.embedding_dim,
                    embedding.len()
                )));
            }

            values.extend_from_slice(embedding);
            metadata.push(serde_json::to_string(&chunk.metadata)?);
        }

        let embedding_array = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.embedding_dim as i32,
            Arc::new(Float32Array::from(values)),
            None,
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to build embedding column: {}", e)))?;

        RecordBatch::try_new(
            Self::create_schema(self.embedding_dim),
            vec![
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.id.as_str()))),
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.source.as_str()))),
                Arc::new(UInt32Array::from_iter_values(chunks.iter().map(|c| c.page))),
                Arc::new(UInt32Array::from_iter_values(chunks.iter().map(|c| c.position))),
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()))),
                Arc::new(embedding_array),
                Arc::new(StringArray::from(metadata)),
            ],
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to create RecordBatch: {}", e)))
    }

    /// Read every row of a result batch back into chunks.
    fn batch_to_chunks(batch: &RecordBatch) -> AppResult<Vec<DocumentChunk>> {
        let ids = string_column(batch, "id")?;
        let sources = string_column(batch, "source")?;
        let pages = u32_column(batch, "page")?;
        let positions = u32_column(batch, "position")?;
        let texts = string_column(batch, "text")?;
        let metadata = string_column(batch, "metadata")?;
        let embeddings = batch
            .column_by_name("embedding")
            .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
            .ok_or_else(|| AppError::Knowledge("Invalid embedding column".to_string()))?;

        let mut chunks = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let values = embeddings.value(row);
            let values = values
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| AppError::Knowledge("Invalid embedding values".to_string()))?;

            chunks.push(DocumentChunk {
                id: ids.value(row).to_string(),
                text: texts.value(row).to_string(),
                source: sources.value(row).to_string(),
                page: pages.value(row),
                position: positions.value(row),
                metadata: serde_json::from_str(metadata.value(row))?,
                embedding: Some(values.values().to_vec()),
            });
        }

        Ok(chunks)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| AppError::Knowledge(format!("Invalid {} column", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
        .ok_or_else(|| AppError::Knowledge(format!("Invalid {} column", name)))
}

#[async_trait::async_trait]
impl VectorIndex for LanceDbIndex {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn add_chunks(&self, chunks: &[DocumentChunk]) -> AppResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let batch = self.chunks_to_batch(chunks)?;
        let schema = batch.schema();

        self.table
            .add(RecordBatchIterator::new(vec![Ok(batch)], schema))
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to add chunks: {}", e)))?;

        tracing::debug!("Inserted {} chunks into '{}'", chunks.len(), self.collection);
        Ok(())
    }

    async fn nearest(&self, query_embedding: &[f32], limit: usize) -> AppResult<Vec<ScoredChunk>> {
        if query_embedding.len() != self.embedding_dim {
            return Err(AppError::Knowledge(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                self.embedding_dim,
                query_embedding.len()
            )));
        }

        if limit == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let batches: Vec<RecordBatch> = self
            .table
            .query()
            .nearest_to(query_embedding.to_vec())
            .map_err(|e| AppError::Knowledge(format!("Failed to create query: {}", e)))?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to execute search: {}", e)))?
            .try_collect()
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to collect results: {}", e)))?;

        let mut results = Vec::new();
        for batch in &batches {
            for chunk in Self::batch_to_chunks(batch)? {
                let score = chunk
                    .embedding
                    .as_deref()
                    .map(|e| cosine_similarity(query_embedding, e))
                    .unwrap_or(0.0);
                results.push(ScoredChunk { chunk, score });
            }
        }

        sort_by_score(&mut results);
        results.truncate(limit);

        tracing::debug!(
            "Retrieved {} chunks from '{}' (requested {})",
            results.len(),
            self.collection,
            limit
        );

        Ok(results)
    }

    async fn count(&self) -> AppResult<u64> {
        let rows = self
            .table
            .count_rows(None)
            .await
            .map_err(|e| AppError::Knowledge(format!("Failed to count rows: {}", e)))?;
        Ok(rows as u64)
    }

    async fn reset(&self) -> AppResult<()> {
        if self.count().await? > 0 {
            self.table
                .delete("id IS NOT NULL")
                .await
                .map_err(|e| AppError::Knowledge(format!("Failed to reset index: {}", e)))?;
        }

        tracing::info!("Reset LanceDB table '{}'", self.collection);
        Ok(())
    }
}
