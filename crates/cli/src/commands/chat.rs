//! Chat command handler.
//!
//! Interactive conversation over the collection. Answers stream to stdout;
//! failures are reported and the session carries on.

use super::ask::{print_sources, print_streamed};
use super::common::{build_pipeline, prepare_knowledge_base};
use clap::Args;
use docchat_chat::{ConversationalRag, SessionHistoryStore, TurnRole};
use docchat_core::{config::AppConfig, AppError, AppResult};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Commands: /history shows the conversation, /clear forgets it, /exit quits.";

/// Chat with the indexed documents
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Session identifier (default: a new random id)
    #[arg(long)]
    pub session: Option<String>,

    /// Don't list the pages each answer was drawn from
    #[arg(long)]
    pub no_sources: bool,
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplInput {
    Empty,
    Exit,
    Clear,
    History,
    Help,
    Unknown(String),
    Question(String),
}

fn parse_input(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }

    match line {
        "/exit" | "/quit" => ReplInput::Exit,
        "/clear" => ReplInput::Clear,
        "/history" => ReplInput::History,
        "/help" => ReplInput::Help,
        command if command.starts_with('/') => ReplInput::Unknown(command.to_string()),
        question => ReplInput::Question(question.to_string()),
    }
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let kb = prepare_knowledge_base(config).await?;
        let rag = build_pipeline(config, &kb, Arc::new(SessionHistoryStore::new()))?;

        let session_id = self
            .session
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::info!("Chat session {}", session_id);

        eprintln!(
            "Chatting with collection '{}'. {}",
            kb.config().name,
            HELP
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await.map_err(AppError::Io)? else {
                // EOF
                println!();
                break;
            };

            match parse_input(&line) {
                ReplInput::Empty => continue,
                ReplInput::Exit => break,
                ReplInput::Help => eprintln!("{}", HELP),
                ReplInput::Unknown(command) => {
                    eprintln!("Unknown command: {}. {}", command, HELP)
                }
                ReplInput::Clear => {
                    let dropped = rag.history().clear(&session_id).await;
                    eprintln!("Conversation cleared ({} messages)", dropped);
                }
                ReplInput::History => self.show_history(&rag, &session_id).await,
                ReplInput::Question(question) => {
                    if let Err(e) = self.answer(&rag, &session_id, &question).await {
                        tracing::error!("Answering failed: {}", e);
                        eprintln!("Error: {}", e);
                    }
                }
            }
        }

        tracing::info!("Chat session {} ended", session_id);
        Ok(())
    }

    async fn answer(
        &self,
        rag: &ConversationalRag,
        session_id: &str,
        question: &str,
    ) -> AppResult<()> {
        let turn = rag.begin(session_id, question).await?;
        tracing::debug!(
            "Searched for '{}' ({} sources)",
            turn.standalone_question,
            turn.sources.len()
        );

        print_streamed(turn.answer).await?;
        if !self.no_sources {
            print_sources(&turn.sources);
        }
        Ok(())
    }

    async fn show_history(&self, rag: &ConversationalRag, session_id: &str) {
        let transcript = rag.history().transcript(session_id).await;
        if transcript.is_empty() {
            eprintln!("(no messages yet)");
            return;
        }

        for turn in transcript {
            let speaker = match turn.role {
                TurnRole::User => "you",
                TurnRole::Assistant => "assistant",
            };
            println!("[{}] {}: {}", turn.at.format("%H:%M:%S"), speaker, turn.content);
        }
    }
}
