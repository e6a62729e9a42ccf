//! Configuration management for docchat.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.docchat/config.yaml` or `--config`)
//! - Environment variables (`DOCCHAT_*`)
//! - Command-line flags
//!
//! The configuration is workspace-centric, with all state stored in `.docchat/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".docchat";

/// Providers the language model factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 3] = ["openai", "ollama", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .docchat/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Chat model provider ("openai", "ollama", "mock")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// Explicit API key, wins over provider-specific env vars
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log record format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmConfig>,

    /// Document collection settings
    pub knowledge: KnowledgeSettings,

    /// Conversation settings
    pub chat: ChatSettings,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider", default)]
    pub active_embedding_provider: Option<String>,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        #[serde(rename = "embeddingDimensions", default)]
        embedding_dimensions: Option<u32>,
        endpoint: Option<String>,
        #[serde(rename = "organizationEnv")]
        organization_env: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        #[serde(rename = "embeddingDimensions", default)]
        embedding_dimensions: Option<u32>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } | ProviderConfig::Ollama { model, .. } => model,
        }
    }
}

/// Which collection to index and query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSettings {
    /// Collection (knowledge base) name
    pub collection: String,

    /// PDF source directory, overrides the collection config
    pub source_dir: Option<PathBuf>,

    /// Vector store directory, overrides the collection config
    pub persist_dir: Option<PathBuf>,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            collection: "documents".to_string(),
            source_dir: None,
            persist_dir: None,
        }
    }
}

/// Conversation behaviour knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    /// Sampling temperature for every chat-model call
    pub temperature: f32,

    /// Persona the answer prompt speaks as
    pub persona: Option<String>,

    /// Rewrite rules such as "expressions referring to a person -> resident"
    pub dictionary: Option<Vec<String>>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            persona: None,
            dictionary: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    knowledge: Option<KnowledgeSettingsFile>,
    chat: Option<ChatSettingsFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeSettingsFile {
    collection: Option<String>,
    source_dir: Option<PathBuf>,
    persist_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatSettingsFile {
    temperature: Option<f32>,
    persona: Option<String>,
    dictionary: Option<Vec<String>>,
}

/// Command-line values layered over file and environment configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub collection: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub verbose: bool,
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            log_level: None,
            log_format: LogFormat::Pretty,
            verbose: false,
            no_color: false,
            llm: None,
            knowledge: KnowledgeSettings::default(),
            chat: ChatSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config file and environment.
    ///
    /// Environment variables:
    /// - `DOCCHAT_WORKSPACE`: Override workspace path
    /// - `DOCCHAT_CONFIG`: Path to config file
    /// - `DOCCHAT_PROVIDER`: Chat model provider
    /// - `DOCCHAT_MODEL`: Chat model identifier
    /// - `DOCCHAT_API_KEY`: API key
    /// - `DOCCHAT_COLLECTION`: Collection name
    /// - `DOCCHAT_LOG_FORMAT`: `pretty` or `json`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use docchat_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(&ConfigOverrides::default())
    }

    /// Load configuration, letting CLI workspace/config paths pick the file
    /// before every other override is applied on top.
    pub fn load_with(overrides: &ConfigOverrides) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("DOCCHAT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }
        if let Ok(config_file) = std::env::var("DOCCHAT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }
        if let Some(ref workspace) = overrides.workspace {
            config.workspace = workspace.clone();
        }
        if let Some(ref config_file) = overrides.config_file {
            config.config_file = Some(config_file.clone());
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.apply_env()?;

        Ok(config.with_overrides(overrides))
    }

    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(provider) = std::env::var("DOCCHAT_PROVIDER") {
            self.provider = provider;
        }
        if let Ok(model) = std::env::var("DOCCHAT_MODEL") {
            self.model = model;
        }
        if let Ok(key) = std::env::var("DOCCHAT_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(collection) = std::env::var("DOCCHAT_COLLECTION") {
            self.knowledge.collection = collection;
        }
        if let Ok(format) = std::env::var("DOCCHAT_LOG_FORMAT") {
            self.log_format = format.parse()?;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }
        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
        Ok(())
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }
            result.llm = Some(llm);
        }

        if let Some(knowledge) = config_file.knowledge {
            if let Some(collection) = knowledge.collection {
                result.knowledge.collection = collection;
            }
            if knowledge.source_dir.is_some() {
                result.knowledge.source_dir = knowledge.source_dir;
            }
            if knowledge.persist_dir.is_some() {
                result.knowledge.persist_dir = knowledge.persist_dir;
            }
        }

        if let Some(chat) = config_file.chat {
            if let Some(temperature) = chat.temperature {
                result.chat.temperature = temperature;
            }
            if chat.persona.is_some() {
                result.chat.persona = chat.persona;
            }
            if chat.dictionary.is_some() {
                result.chat.dictionary = chat.dictionary;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(ref workspace) = overrides.workspace {
            self.workspace = workspace.clone();
        }
        if let Some(ref config_file) = overrides.config_file {
            self.config_file = Some(config_file.clone());
        }
        if let Some(ref provider) = overrides.provider {
            self.provider = provider.clone();
        }
        if let Some(ref model) = overrides.model {
            self.model = model.clone();
        }
        if let Some(ref collection) = overrides.collection {
            self.knowledge.collection = collection.clone();
        }
        if let Some(ref log_level) = overrides.log_level {
            self.log_level = Some(log_level.clone());
        }
        if let Some(format) = overrides.log_format {
            self.log_format = format;
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .docchat directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .docchat directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Get the configuration block of a provider, if any.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the API key for a provider.
    ///
    /// Order: explicit `DOCCHAT_API_KEY`, the provider's `apiKeyEnv`, then
    /// `OPENAI_API_KEY` for the openai provider.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(api_key_env) {
                return Some(key);
            }
        }

        if provider == "openai" {
            return std::env::var("OPENAI_API_KEY").ok();
        }

        None
    }

    /// Endpoint configured for a provider, if any.
    pub fn resolve_endpoint(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.clone(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.clone()),
        }
    }

    /// Provider used for embeddings when a collection config doesn't pin one.
    pub fn embedding_provider(&self) -> Option<&str> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.active_embedding_provider.as_deref())
    }

    /// Embedding model configured for a provider, if any.
    pub fn embedding_model(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI {
                embedding_model, ..
            }
            | ProviderConfig::Ollama {
                embedding_model, ..
            } => embedding_model.clone(),
        }
    }

    /// Vector size configured for a provider's embedding model, if any.
    pub fn embedding_dimensions(&self, provider: &str) -> Option<u32> {
        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI {
                embedding_dimensions,
                ..
            }
            | ProviderConfig::Ollama {
                embedding_dimensions,
                ..
            } => *embedding_dimensions,
        }
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();

        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "openai" && self.resolve_api_key(provider).is_none() {
            let env_var = match self.get_provider_config(provider) {
                Some(ProviderConfig::OpenAI { api_key_env, .. }) => api_key_env.clone(),
                _ => "OPENAI_API_KEY".to_string(),
            };
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                env_var
            )));
        }

        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(AppError::Config(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.chat.temperature
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.knowledge.collection, "documents");
        assert_eq!(config.chat.temperature, 0.0);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_state_dir() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(".docchat"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(&ConfigOverrides {
            provider: Some("ollama".to_string()),
            model: Some("llama3.2".to_string()),
            collection: Some("housing".to_string()),
            verbose: true,
            ..Default::default()
        });

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert_eq!(overridden.knowledge.collection, "housing");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: ollama
  providers:
    ollama:
      endpoint: http://localhost:11434
      model: qwen2.5
      embeddingModel: nomic-embed-text
      embeddingDimensions: 768
    openai:
      apiKeyEnv: MY_OPENAI_KEY
      model: gpt-4o-mini
logging:
  level: warn
  format: json
knowledge:
  collection: housing_docs
  sourceDir: pdfs
chat:
  temperature: 0.2
  dictionary:
    - "expressions referring to a person -> resident"
"#,
        )
        .unwrap();

        let config = AppConfig::default().merge_yaml(&path).unwrap();

        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "qwen2.5");
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.knowledge.collection, "housing_docs");
        assert_eq!(config.knowledge.source_dir, Some(PathBuf::from("pdfs")));
        assert_eq!(config.chat.temperature, 0.2);
        assert_eq!(config.chat.dictionary.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            config.resolve_endpoint("ollama").as_deref(),
            Some("http://localhost:11434")
        );
        assert_eq!(
            config.embedding_model("ollama").as_deref(),
            Some("nomic-embed-text")
        );
        assert_eq!(config.embedding_dimensions("ollama"), Some(768));
        assert_eq!(config.embedding_dimensions("openai"), None);
        assert!(matches!(
            config.get_provider_config("openai"),
            Some(ProviderConfig::OpenAI { .. })
        ));
    }

    #[test]
    fn test_load_with_workspace_override() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(STATE_DIR)).unwrap();
        std::fs::write(
            temp.path().join(STATE_DIR).join("config.yaml"),
            "knowledge:\n  collection: from_file\n",
        )
        .unwrap();

        let config = AppConfig::load_with(&ConfigOverrides {
            workspace: Some(temp.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(config.workspace, temp.path());
        if std::env::var("DOCCHAT_COLLECTION").is_err() {
            assert_eq!(config.knowledge.collection, "from_file");
        }
    }

    #[test]
    fn test_load_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_with(&ConfigOverrides {
            workspace: Some(temp.path().to_path_buf()),
            config_file: Some(temp.path().join("missing.yaml")),
            ..Default::default()
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let config = AppConfig {
            api_key: Some("sk-explicit".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_api_key("openai").as_deref(),
            Some("sk-explicit")
        );
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_offline_providers() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        assert!(config.validate().is_ok());

        config.provider = "mock".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_temperature_range() {
        let mut config = AppConfig::default();
        config.provider = "mock".to_string();
        config.chat.temperature = 3.5;
        assert!(config.validate().is_err());
    }
}
