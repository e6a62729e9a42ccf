//! Conversational question answering over indexed documents.
//!
//! A turn rewrites the question with the dictionary, reformulates it against
//! the session history, retrieves chunks with MMR and streams a short answer
//! grounded in them.
//!
//! # Example
//! ```no_run
//! use docchat_chat::{ChatConfig, ConversationalRag, PromptSet, SessionHistoryStore};
//! use docchat_knowledge::{KnowledgeBase, KnowledgeBaseConfig};
//! use docchat_llm::MockLlmClient;
//! use futures::StreamExt;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let kb = KnowledgeBase::open(Path::new("."), KnowledgeBaseConfig::default(), None).await?;
//! kb.ensure_indexed().await?;
//!
//! let rag = ConversationalRag::new(
//!     Arc::new(MockLlmClient::new()),
//!     kb.retriever(),
//!     PromptSet::builtin()?,
//!     &ChatConfig::default(),
//!     Arc::new(SessionHistoryStore::new()),
//! )?;
//!
//! let mut answer = rag.stream("session-1", "When is the deposit due?").await?;
//! while let Some(fragment) = answer.next().await {
//!     print!("{}", fragment?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod contextualize;
pub mod history;
pub mod pipeline;
pub mod rewrite;
pub mod types;

pub use answer::{AnswerGenerator, AnswerStream, REFUSAL};
pub use contextualize::{ContextualRetrieval, HistoryAwareRetriever};
pub use history::{ConversationTurn, SessionHistoryStore, TurnRole};
pub use pipeline::{ChatTurn, ConversationalRag, PromptSet};
pub use rewrite::QuestionRewriter;
pub use types::{default_dictionary, ChatAnswer, ChatConfig, SourceRef, DEFAULT_PERSONA};
