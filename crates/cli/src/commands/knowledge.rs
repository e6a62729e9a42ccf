//! Knowledge command handler.
//!
//! Manages the PDF collection behind the chat.

use super::common::{knowledge_config, open_knowledge_base};
use clap::{Args, Subcommand};
use docchat_core::{config::AppConfig, AppError, AppResult};
use docchat_knowledge::{IndexOutcome, IndexStats};

/// Collection management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Index the PDF directory into the collection
    Index(KnowledgeIndexCommand),
    /// Show the chunks a question retrieves
    Search(KnowledgeSearchCommand),
    /// Show collection statistics
    Stats(KnowledgeStatsCommand),
    /// Remove every chunk from the collection
    Clean(KnowledgeCleanCommand),
}

/// Index PDFs
#[derive(Args, Debug)]
pub struct KnowledgeIndexCommand {
    /// Re-index even if the collection already holds data
    #[arg(long)]
    pub force: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeIndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge index command (force: {})", self.force);

        let kb = open_knowledge_base(config).await?;
        let name = kb.config().name.clone();

        let stats = if self.force {
            Some(kb.reindex().await?)
        } else {
            match kb.ensure_indexed().await? {
                IndexOutcome::Indexed(stats) => Some(stats),
                IndexOutcome::Skipped { existing } => {
                    if self.json {
                        print_json(&serde_json::json!({
                            "collection": name,
                            "skipped": true,
                            "chunksCount": existing,
                        }))?;
                    } else {
                        println!(
                            "Collection '{}' already holds {} chunks; use --force to re-index",
                            name, existing
                        );
                    }
                    None
                }
                IndexOutcome::Unverified { reason } => {
                    if self.json {
                        print_json(&serde_json::json!({
                            "collection": name,
                            "skipped": true,
                            "unverified": true,
                            "reason": reason,
                        }))?;
                    } else {
                        println!(
                            "Could not read collection '{}' ({}); left untouched, use --force to rebuild it",
                            name, reason
                        );
                    }
                    None
                }
            }
        };

        if let Some(stats) = stats {
            self.report(&name, &stats)?;
        }
        Ok(())
    }

    fn report(&self, name: &str, stats: &IndexStats) -> AppResult<()> {
        if self.json {
            return print_json(&serde_json::json!({
                "collection": name,
                "skipped": false,
                "documents": stats.documents,
                "pages": stats.pages,
                "chunksCount": stats.chunks,
                "skippedFiles": stats.skipped_files,
                "durationSecs": stats.duration_secs,
            }));
        }

        println!(
            "Indexed {} documents ({} pages, {} chunks) into '{}' in {:.2}s",
            stats.documents, stats.pages, stats.chunks, name, stats.duration_secs
        );
        if stats.skipped_files > 0 {
            println!("  Skipped {} unreadable files", stats.skipped_files);
        }
        Ok(())
    }
}

/// Search the collection
#[derive(Args, Debug)]
pub struct KnowledgeSearchCommand {
    /// Query text
    pub query: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeSearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge search command");

        let kb = open_knowledge_base(config).await?;
        let results = kb.retriever().retrieve_scored(&self.query).await?;

        if self.json {
            let items: Vec<_> = results
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "source": r.chunk.source,
                        "page": r.chunk.page,
                        "score": r.score,
                        "text": r.chunk.text,
                    })
                })
                .collect();
            return print_json(&serde_json::json!({ "query": self.query, "results": items }));
        }

        if results.is_empty() {
            println!("No chunks found in '{}'", kb.config().name);
            return Ok(());
        }

        for (i, result) in results.iter().enumerate() {
            println!(
                "[{}] {} (page {}) score={:.3}",
                i + 1,
                result.chunk.source,
                result.chunk.page,
                result.score
            );
            println!("{}", result.chunk.text.trim());
            println!();
        }
        Ok(())
    }
}

/// Show collection stats
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge stats command");

        let kb_config = knowledge_config(config)?;
        let stats = docchat_knowledge::stats(&config.workspace, &kb_config).await?;

        if self.json {
            return print_json(&serde_json::json!({
                "collection": stats.collection,
                "sourcesCount": stats.sources_count,
                "chunksCount": stats.chunks_count,
                "lastIndexedAt": stats.last_indexed_at,
            }));
        }

        println!("Collection: {}", stats.collection);
        println!("  Sources: {}", stats.sources_count);
        println!("  Chunks: {}", stats.chunks_count);
        match stats.last_indexed_at {
            Some(at) => println!("  Last indexed: {}", at),
            None => println!("  Last indexed: never"),
        }
        Ok(())
    }
}

/// Clean the collection
#[derive(Args, Debug)]
pub struct KnowledgeCleanCommand {}

impl KnowledgeCleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge clean command");

        let kb_config = knowledge_config(config)?;
        if docchat_knowledge::clean(&config.workspace, &kb_config).await? {
            println!("Collection '{}' cleaned", kb_config.name);
        } else {
            println!("Collection '{}' does not exist", kb_config.name);
        }
        Ok(())
    }
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            KnowledgeAction::Index(cmd) => cmd.execute(config).await,
            KnowledgeAction::Search(cmd) => cmd.execute(config).await,
            KnowledgeAction::Stats(cmd) => cmd.execute(config).await,
            KnowledgeAction::Clean(cmd) => cmd.execute(config).await,
        }
    }
}

fn print_json(value: &serde_json::Value) -> AppResult<()> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
