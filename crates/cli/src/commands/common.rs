//! Wiring shared by the commands: collection settings, the knowledge base
//! and the conversation pipeline.

use docchat_chat::{ChatConfig, ConversationalRag, PromptSet, SessionHistoryStore};
use docchat_core::{config::AppConfig, AppError, AppResult};
use docchat_knowledge::config::{get_config_path, load_config};
use docchat_knowledge::{
    known_dimensions, IndexOutcome, KnowledgeBase, KnowledgeBaseConfig, ProgressEvent,
    ProgressReporter,
};
use docchat_llm::create_client;
use std::sync::Arc;

/// Collection settings with application-level overrides applied.
///
/// A collection `config.yaml` pins its embedding provider; without one the
/// `activeEmbeddingProvider` of the application config is used.
pub fn knowledge_config(config: &AppConfig) -> AppResult<KnowledgeBaseConfig> {
    let name = &config.knowledge.collection;
    let mut kb_config = load_config(&config.workspace, name)?;

    if let Some(ref source_dir) = config.knowledge.source_dir {
        kb_config.source_dir = source_dir.clone();
    }
    if let Some(ref persist_dir) = config.knowledge.persist_dir {
        kb_config.persist_dir = Some(persist_dir.clone());
    }

    if !get_config_path(&config.workspace, name).exists() {
        if let Some(provider) = config.embedding_provider() {
            kb_config.provider = provider.to_string();
            if let Some(model) = config.embedding_model(provider) {
                kb_config.model = model;
            }
            kb_config.embedding_dim = match config.embedding_dimensions(provider) {
                Some(dims) => dims,
                None => known_dimensions(&kb_config.model).ok_or_else(|| {
                    AppError::Config(format!(
                        "Unknown vector size for embedding model '{}'; set embeddingDimensions under providers.{}",
                        kb_config.model, provider
                    ))
                })?,
            };
            if kb_config.endpoint.is_none() {
                kb_config.endpoint = config.resolve_endpoint(provider);
            }
        }
    }

    tracing::debug!(
        "Collection '{}': embeddings {}/{} ({} dims), source {:?}",
        kb_config.name,
        kb_config.provider,
        kb_config.model,
        kb_config.embedding_dim,
        kb_config.source_dir
    );

    Ok(kb_config)
}

/// Progress lines on stderr, keeping stdout for answers.
pub fn stderr_progress() -> ProgressReporter {
    ProgressReporter::new(Arc::new(|event: ProgressEvent| {
        eprintln!("{}", event.format_simple());
    }))
}

/// Open the configured collection with progress reporting.
pub async fn open_knowledge_base(config: &AppConfig) -> AppResult<KnowledgeBase> {
    let kb_config = knowledge_config(config)?;
    let api_key = config.resolve_api_key(&kb_config.provider);

    let kb = KnowledgeBase::open(&config.workspace, kb_config, api_key.as_deref()).await?;
    Ok(kb.with_progress(stderr_progress()))
}

/// Open the collection and index it if it is empty.
pub async fn prepare_knowledge_base(config: &AppConfig) -> AppResult<KnowledgeBase> {
    let kb = open_knowledge_base(config).await?;

    match kb.ensure_indexed().await? {
        IndexOutcome::Indexed(stats) => eprintln!(
            "Indexed {} documents ({} chunks) into '{}' in {:.2}s",
            stats.documents,
            stats.chunks,
            kb.config().name,
            stats.duration_secs
        ),
        IndexOutcome::Skipped { existing } => tracing::info!(
            "Collection '{}' ready with {} chunks",
            kb.config().name,
            existing
        ),
        IndexOutcome::Unverified { reason } => eprintln!(
            "Warning: could not read collection '{}' ({}); answering from it as is",
            kb.config().name,
            reason
        ),
    }

    Ok(kb)
}

/// Conversation pipeline over `kb` using the configured chat model.
pub fn build_pipeline(
    config: &AppConfig,
    kb: &KnowledgeBase,
    history: Arc<SessionHistoryStore>,
) -> AppResult<ConversationalRag> {
    config.validate()?;

    let endpoint = config.resolve_endpoint(&config.provider);
    let api_key = config.resolve_api_key(&config.provider);
    let llm = create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())?;

    let prompts = PromptSet::load(&config.workspace)?;
    let chat_config = ChatConfig::from_settings(&config.model, &config.chat);

    tracing::debug!(
        "Chat model {}/{} at temperature {}",
        config.provider,
        chat_config.model,
        chat_config.temperature
    );

    ConversationalRag::new(llm, kb.retriever(), prompts, &chat_config, history)
}
