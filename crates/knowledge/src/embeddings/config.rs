//! Embedding configuration derived from collection settings.

use crate::types::KnowledgeBaseConfig;
use docchat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding settings for one collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama", "mock"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Override for the provider's API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: default_batch_size(),
            endpoint: None,
        }
    }
}

/// Vector size of well-known embedding models.
pub fn known_dimensions(model: &str) -> Option<u32> {
    let dims = match model {
        "text-embedding-3-large" => 3072,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        "mxbai-embed-large" => 1024,
        "nomic-embed-text" => 768,
        "all-minilm" => 384,
        "trigram-v1" => 384,
        _ => return None,
    };
    Some(dims)
}

impl From<&KnowledgeBaseConfig> for EmbeddingConfig {
    fn from(config: &KnowledgeBaseConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            model: config.model.clone(),
            dimensions: config.embedding_dim as usize,
            batch_size: config.batch_size.max(1),
            endpoint: config.endpoint.clone(),
        }
    }
}

impl EmbeddingConfig {
    /// Check that vectors produced by `other` can live in the same table.
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        if self.provider != other.provider {
            return Err(AppError::Knowledge(format!(
                "Provider mismatch: expected '{}', got '{}'",
                self.provider, other.provider
            )));
        }

        if self.model != other.model {
            return Err(AppError::Knowledge(format!(
                "Model mismatch: expected '{}', got '{}'",
                self.model, other.model
            )));
        }

        if self.dimensions != other.dimensions {
            return Err(AppError::Knowledge(format!(
                "Dimension mismatch: expected {}, got {}",
                self.dimensions, other.dimensions
            )));
        }

        Ok(())
    }
}
