//! Ask command handler.
//!
//! Answers a single question from the collection in a fresh session.

use super::common::{build_pipeline, prepare_knowledge_base};
use clap::Args;
use docchat_chat::{AnswerStream, SessionHistoryStore, SourceRef};
use docchat_core::{config::AppConfig, AppError, AppResult};
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Ask one question about the indexed documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Print the whole answer at once instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Output as JSON (implies --no-stream)
    #[arg(long)]
    pub json: bool,

    /// Don't list the pages the answer was drawn from
    #[arg(long)]
    pub no_sources: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.get_question()?;

        let kb = prepare_knowledge_base(config).await?;
        let rag = build_pipeline(config, &kb, Arc::new(SessionHistoryStore::new()))?;
        let session_id = uuid::Uuid::new_v4().to_string();

        if self.json {
            let answer = rag.answer(&session_id, &question).await?;
            let json = serde_json::to_string_pretty(&answer)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
            return Ok(());
        }

        if self.no_stream {
            let answer = rag.answer(&session_id, &question).await?;
            println!("{}", answer.answer);
            if !self.no_sources {
                print_sources(&answer.sources);
            }
            return Ok(());
        }

        let turn = rag.begin(&session_id, &question).await?;
        print_streamed(turn.answer).await?;
        if !self.no_sources {
            print_sources(&turn.sources);
        }

        Ok(())
    }

    fn get_question(&self) -> AppResult<String> {
        let question = match (&self.question, &self.file) {
            (Some(question), _) => question.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read question file {:?}: {}", path, e))
            })?,
            (None, None) => {
                return Err(AppError::Config("No question provided".to_string()));
            }
        };

        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Config("The question is empty".to_string()));
        }
        Ok(question.to_string())
    }
}

/// Write fragments to stdout as they arrive.
pub async fn print_streamed(mut answer: AnswerStream) -> AppResult<()> {
    let mut stdout = std::io::stdout();

    while let Some(fragment) = answer.next().await {
        let fragment = fragment?;
        print!("{}", fragment);
        stdout.flush().ok();
    }
    println!();

    Ok(())
}

/// List sources on stderr, one per page.
pub fn print_sources(sources: &[SourceRef]) {
    if sources.is_empty() {
        return;
    }

    let mut seen = Vec::new();
    eprintln!("Sources:");
    for source in sources {
        let key = (source.source.as_str(), source.page);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        eprintln!("- {} (page {})", source.source, source.page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command(question: Option<&str>, file: Option<PathBuf>) -> AskCommand {
        AskCommand {
            question: question.map(str::to_string),
            file,
            no_stream: false,
            json: false,
            no_sources: false,
        }
    }

    #[test]
    fn test_question_from_argument() {
        let cmd = command(Some("  When is the deposit due?\n"), None);
        assert_eq!(cmd.get_question().unwrap(), "When is the deposit due?");
    }

    #[test]
    fn test_question_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("question.txt");
        std::fs::write(&path, "Who may apply?\n").unwrap();

        let cmd = command(None, Some(path));
        assert_eq!(cmd.get_question().unwrap(), "Who may apply?");
    }

    #[test]
    fn test_missing_or_blank_question() {
        assert!(command(None, None).get_question().is_err());
        assert!(command(Some("   "), None).get_question().is_err());
    }
}
