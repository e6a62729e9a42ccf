//! Collection configuration and on-disk layout.
//!
//! ```text
//! .docchat/knowledge/<collection>/
//!   config.yaml    collection settings
//!   stats.json     record of the last indexing run
//!   vectors/       LanceDB data (unless persist_dir says otherwise)
//! ```

use crate::types::{IndexManifest, KnowledgeBaseConfig};
use docchat_core::config::STATE_DIR;
use docchat_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Load collection configuration.
///
/// Loads from `.docchat/knowledge/<collection>/config.yaml` if it exists,
/// otherwise returns defaults named after the collection.
pub fn load_config(workspace: &Path, base_name: &str) -> AppResult<KnowledgeBaseConfig> {
    let config_path = get_config_path(workspace, base_name);

    if !config_path.exists() {
        tracing::debug!(
            "Using default config for collection '{}' (no config file found)",
            base_name
        );
        return Ok(KnowledgeBaseConfig {
            name: base_name.to_string(),
            ..Default::default()
        });
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Knowledge(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let mut config: KnowledgeBaseConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Knowledge(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    // The directory name is authoritative
    config.name = base_name.to_string();

    validate_config(&config)?;

    tracing::debug!("Loaded config for collection '{}'", base_name);
    Ok(config)
}

/// Save collection configuration.
pub fn save_config(workspace: &Path, config: &KnowledgeBaseConfig) -> AppResult<()> {
    validate_config(config)?;

    let config_path = get_config_path(workspace, &config.name);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Knowledge(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| AppError::Knowledge(format!("Failed to serialize config: {}", e)))?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Knowledge(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved config for collection '{}'", config.name);
    Ok(())
}

/// Reject settings the splitter or retriever cannot honour.
pub fn validate_config(config: &KnowledgeBaseConfig) -> AppResult<()> {
    if config.name.trim().is_empty() {
        return Err(AppError::Knowledge(
            "Collection name cannot be empty".to_string(),
        ));
    }
    if config.chunk_size == 0 {
        return Err(AppError::Knowledge("chunk_size must be positive".to_string()));
    }
    if config.chunk_overlap >= config.chunk_size {
        return Err(AppError::Knowledge(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            config.chunk_overlap, config.chunk_size
        )));
    }
    if config.embedding_dim == 0 {
        return Err(AppError::Knowledge(
            "embedding_dim must be positive".to_string(),
        ));
    }
    if config.retrieval.k == 0 {
        return Err(AppError::Knowledge("retrieval.k must be positive".to_string()));
    }
    if !(0.0..=1.0).contains(&config.retrieval.lambda_mult) {
        return Err(AppError::Knowledge(format!(
            "retrieval.lambda_mult must be within 0.0..=1.0, got {}",
            config.retrieval.lambda_mult
        )));
    }
    Ok(())
}

/// Get the base directory for a collection.
pub fn get_base_dir(workspace: &Path, base_name: &str) -> PathBuf {
    workspace.join(STATE_DIR).join("knowledge").join(base_name)
}

/// Get the path to a collection's config file.
pub fn get_config_path(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("config.yaml")
}

/// Get the stats JSON path for a collection.
pub fn get_stats_path(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("stats.json")
}

/// Directory holding the LanceDB tables for a collection.
pub fn get_persist_dir(workspace: &Path, config: &KnowledgeBaseConfig) -> PathBuf {
    match config.persist_dir {
        Some(ref dir) => resolve(workspace, dir),
        None => get_base_dir(workspace, &config.name).join("vectors"),
    }
}

/// Directory scanned for PDFs.
pub fn get_source_dir(workspace: &Path, config: &KnowledgeBaseConfig) -> PathBuf {
    resolve(workspace, &config.source_dir)
}

fn resolve(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// Load the manifest of the last indexing run, if any.
pub fn load_manifest(workspace: &Path, base_name: &str) -> AppResult<Option<IndexManifest>> {
    let path = get_stats_path(workspace, base_name);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|e| {
        AppError::Knowledge(format!("Failed to read stats at {:?}: {}", path, e))
    })?;
    let manifest = serde_json::from_str(&content)?;
    Ok(Some(manifest))
}

/// Persist the manifest of an indexing run.
pub fn save_manifest(workspace: &Path, manifest: &IndexManifest) -> AppResult<()> {
    let path = get_stats_path(workspace, &manifest.collection);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(&path, json).map_err(|e| {
        AppError::Knowledge(format!("Failed to write stats to {:?}: {}", path, e))
    })?;
    Ok(())
}

/// Remove the manifest; missing files are fine.
pub fn remove_manifest(workspace: &Path, base_name: &str) -> AppResult<()> {
    let path = get_stats_path(workspace, base_name);
    if path.exists() {
        fs::remove_file(&path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), "housing").unwrap();

        assert_eq!(config.name, "housing");
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "text-embedding-3-large");
        assert_eq!(config.chunk_size, 1200);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let config = KnowledgeBaseConfig {
            name: "my-base".to_string(),
            chunk_size: 800,
            chunk_overlap: 100,
            provider: "mock".to_string(),
            ..Default::default()
        };

        save_config(temp.path(), &config).unwrap();

        let loaded = load_config(temp.path(), "my-base").unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_size() {
        let config = KnowledgeBaseConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_lambda_out_of_range() {
        let mut config = KnowledgeBaseConfig::default();
        config.retrieval.lambda_mult = 1.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_paths() {
        let workspace = Path::new("/ws");
        let mut config = KnowledgeBaseConfig {
            name: "housing".to_string(),
            ..Default::default()
        };

        assert_eq!(
            get_persist_dir(workspace, &config),
            PathBuf::from("/ws/.docchat/knowledge/housing/vectors")
        );
        assert_eq!(get_source_dir(workspace, &config), PathBuf::from("/ws/docs"));

        config.persist_dir = Some(PathBuf::from("/data/chroma"));
        assert_eq!(get_persist_dir(workspace, &config), PathBuf::from("/data/chroma"));
    }

    #[test]
    fn test_manifest_roundtrip_and_remove() {
        let temp = TempDir::new().unwrap();
        assert!(load_manifest(temp.path(), "docs").unwrap().is_none());

        let manifest = IndexManifest {
            collection: "docs".to_string(),
            sources: vec!["docs/a.pdf".to_string()],
            documents: 1,
            chunks: 3,
            indexed_at: Utc::now(),
            embedding: None,
        };
        save_manifest(temp.path(), &manifest).unwrap();
        assert_eq!(load_manifest(temp.path(), "docs").unwrap(), Some(manifest));

        remove_manifest(temp.path(), "docs").unwrap();
        assert!(load_manifest(temp.path(), "docs").unwrap().is_none());
    }
}
