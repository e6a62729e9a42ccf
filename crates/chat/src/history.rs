//! Per-session conversation transcripts.
//!
//! Sessions live for the lifetime of the store. Nothing is evicted or
//! persisted; only `clear` empties a transcript.

use chrono::{DateTime, Utc};
use docchat_llm::ChatMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One message of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            at: Utc::now(),
        }
    }

    /// The turn as a chat-model message.
    pub fn to_message(&self) -> ChatMessage {
        match self.role {
            TurnRole::User => ChatMessage::user(self.content.clone()),
            TurnRole::Assistant => ChatMessage::assistant(self.content.clone()),
        }
    }
}

/// In-memory map from session id to transcript.
#[derive(Debug, Default)]
pub struct SessionHistoryStore {
    sessions: RwLock<HashMap<String, Vec<ConversationTurn>>>,
}

impl SessionHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a session's transcript, creating the session if needed.
    pub async fn transcript(&self, session_id: &str) -> Vec<ConversationTurn> {
        if let Some(turns) = self.sessions.read().await.get(session_id) {
            return turns.clone();
        }

        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    pub async fn append(&self, session_id: &str, turn: ConversationTurn) {
        let mut sessions = self.sessions.write().await;
        let turns = sessions.entry(session_id.to_string()).or_default();
        turns.push(turn);

        tracing::debug!(
            session_id,
            turns = turns.len(),
            "Appended turn to unbounded session history"
        );
    }

    /// Append a question and its answer together so no reader sees one
    /// without the other.
    pub async fn append_exchange(&self, session_id: &str, question: &str, answer: &str) {
        let mut sessions = self.sessions.write().await;
        let turns = sessions.entry(session_id.to_string()).or_default();
        turns.push(ConversationTurn::user(question));
        turns.push(ConversationTurn::assistant(answer));

        tracing::debug!(
            session_id,
            turns = turns.len(),
            "Appended exchange to unbounded session history"
        );
    }

    /// Empty a session's transcript. Returns the number of turns dropped.
    pub async fn clear(&self, session_id: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let turns = sessions.entry(session_id.to_string()).or_default();
        let dropped = turns.len();
        turns.clear();

        tracing::info!(session_id, dropped, "Cleared session history");
        dropped
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
