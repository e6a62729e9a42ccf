//! Knowledge system type definitions.

use crate::embeddings::EmbeddingConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a document collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeBaseConfig {
    /// Collection name, also the vector table name
    pub name: String,

    /// Directory scanned for PDFs
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Vector store directory; defaults to `.docchat/knowledge/<name>/vectors`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_dir: Option<PathBuf>,

    /// Embedding provider ("openai", "ollama", "mock")
    pub provider: String,

    /// Embedding model
    pub model: String,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: u32,

    /// Override for the embedding API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// Texts sent per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Retrieval parameters used on the answer path
    #[serde(default)]
    pub retrieval: RetrievalParams,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("docs")
}

fn default_embedding_dim() -> u32 {
    3072
}

fn default_chunk_size() -> u32 {
    1200
}

fn default_chunk_overlap() -> u32 {
    150
}

fn default_batch_size() -> usize {
    64
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            name: "documents".to_string(),
            source_dir: default_source_dir(),
            persist_dir: None,
            provider: "openai".to_string(),
            model: "text-embedding-3-large".to_string(),
            embedding_dim: default_embedding_dim(),
            endpoint: None,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            batch_size: default_batch_size(),
            retrieval: RetrievalParams::default(),
        }
    }
}

/// Maximal Marginal Relevance parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalParams {
    /// Chunks returned
    pub k: usize,

    /// Nearest candidates considered before re-ranking
    pub fetch_k: usize,

    /// 1.0 ranks purely by relevance, 0.0 purely by diversity
    pub lambda_mult: f32,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            k: 4,
            fetch_k: 20,
            lambda_mult: 0.9,
        }
    }
}

impl RetrievalParams {
    /// Candidate pool size; never smaller than `k`.
    pub fn effective_fetch_k(&self) -> usize {
        self.fetch_k.max(self.k)
    }
}

/// Text of one PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub source: PathBuf,
    /// 1-based page number
    pub page: u32,
    pub text: String,
}

/// A retrievable text fragment with provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Text content
    pub text: String,

    /// Source file path
    pub source: String,

    /// 1-based page number within the source
    pub page: u32,

    /// Position of the chunk within its source document
    pub position: u32,

    /// Provenance (content hash, indexing time, ...)
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// Embedding vector, present once embedded or when read back from the index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl DocumentChunk {
    /// File name of the source, for display.
    pub fn source_name(&self) -> &str {
        std::path::Path::new(&self.source)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.source)
    }
}

/// A chunk with its similarity to a query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Options for an indexing run.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Directory scanned recursively for PDFs
    pub source_dir: PathBuf,

    /// Target chunk size in characters
    pub chunk_size: usize,

    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl IndexOptions {
    pub fn from_config(config: &KnowledgeBaseConfig, source_dir: PathBuf) -> Self {
        Self {
            source_dir,
            chunk_size: config.chunk_size as usize,
            chunk_overlap: config.chunk_overlap as usize,
        }
    }
}

/// Statistics from an indexing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexStats {
    /// PDFs whose pages were read
    pub documents: u32,

    /// Non-empty pages read
    pub pages: u32,

    /// Chunks written to the collection
    pub chunks: u32,

    /// PDFs that could not be read or held no text
    pub skipped_files: u32,

    /// Paths of the indexed PDFs
    #[serde(default)]
    pub sources: Vec<String>,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Result of `ensure_indexed_once`.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    /// The collection already held data; nothing was done
    Skipped { existing: u64 },
    /// The collection could not be counted; assumed indexed, nothing was done
    Unverified { reason: String },
    /// The corpus was indexed
    Indexed(IndexStats),
}

/// Record of the last indexing run, stored as `stats.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    pub collection: String,
    pub sources: Vec<String>,
    pub documents: u32,
    pub chunks: u32,
    pub indexed_at: DateTime<Utc>,
    /// Embedding settings the vectors were produced with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingConfig>,
}

/// Statistics for a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Collection name
    pub collection: String,

    /// Entries in the vector table
    pub chunks_count: u64,

    /// Source documents recorded by the last indexing run
    pub sources_count: u32,

    /// Last indexing time
    pub last_indexed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: KnowledgeBaseConfig =
            serde_yaml::from_str("name: docs\nprovider: mock\nmodel: trigram-v1\n").unwrap();
        assert_eq!(config.chunk_size, 1200);
        assert_eq!(config.chunk_overlap, 150);
        assert_eq!(config.embedding_dim, 3072);
        assert_eq!(config.source_dir, PathBuf::from("docs"));
        assert_eq!(config.retrieval, RetrievalParams::default());
    }

    #[test]
    fn test_retrieval_params_yaml() {
        let params: RetrievalParams =
            serde_yaml::from_str("k: 2\nfetch_k: 10\nlambda_mult: 0.5\n").unwrap();
        assert_eq!(params.k, 2);
        assert_eq!(params.fetch_k, 10);
        assert_eq!(params.lambda_mult, 0.5);

        let partial: RetrievalParams = serde_yaml::from_str("k: 6\n").unwrap();
        assert_eq!(partial.fetch_k, 20);
    }

    #[test]
    fn test_effective_fetch_k() {
        let params = RetrievalParams {
            k: 8,
            fetch_k: 3,
            lambda_mult: 0.9,
        };
        assert_eq!(params.effective_fetch_k(), 8);
        assert_eq!(RetrievalParams::default().effective_fetch_k(), 20);
    }

    #[test]
    fn test_source_name() {
        let chunk = DocumentChunk {
            id: "c1".to_string(),
            text: "text".to_string(),
            source: "docs/notice/announcement.pdf".to_string(),
            page: 2,
            position: 0,
            metadata: serde_json::json!({}),
            embedding: None,
        };
        assert_eq!(chunk.source_name(), "announcement.pdf");
    }
}
