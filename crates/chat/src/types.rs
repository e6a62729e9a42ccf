//! Conversation types.

use docchat_core::config::ChatSettings;
use docchat_knowledge::DocumentChunk;
use serde::{Deserialize, Serialize};

/// Persona used when the configuration names none.
pub const DEFAULT_PERSONA: &str = "an expert on the indexed documents";

const SNIPPET_CHARS: usize = 160;

/// Rewrite rules applied when the configuration names none.
pub fn default_dictionary() -> Vec<String> {
    vec!["expressions referring to a person -> resident".to_string()]
}

/// Settings shared by every model call of a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Chat model identifier
    pub model: String,

    /// Sampling temperature, 0.0 for reproducible answers
    pub temperature: f32,

    /// Who the answer prompt speaks as
    pub persona: String,

    /// Rewrite rules, one per entry
    pub dictionary: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            persona: DEFAULT_PERSONA.to_string(),
            dictionary: default_dictionary(),
        }
    }
}

impl ChatConfig {
    pub fn from_settings(model: &str, settings: &ChatSettings) -> Self {
        Self {
            model: model.to_string(),
            temperature: settings.temperature,
            persona: settings
                .persona
                .clone()
                .unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            dictionary: settings
                .dictionary
                .clone()
                .unwrap_or_else(default_dictionary),
        }
    }
}

/// Where a piece of an answer came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// File name of the PDF
    pub source: String,

    /// 1-based page number
    pub page: u32,

    /// Start of the chunk text
    pub snippet: String,
}

impl From<&DocumentChunk> for SourceRef {
    fn from(chunk: &DocumentChunk) -> Self {
        let flat = chunk.text.split_whitespace().collect::<Vec<_>>().join(" ");
        let snippet = if flat.chars().count() > SNIPPET_CHARS {
            let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
            format!("{}...", cut.trim_end())
        } else {
            flat
        };

        Self {
            source: chunk.source_name().to_string(),
            page: chunk.page,
            snippet,
        }
    }
}

/// A completed, non-streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,

    /// Question after dictionary rewriting
    pub rewritten_question: String,

    /// Question after resolving references to the history; used for retrieval
    pub standalone_question: String,

    pub sources: Vec<SourceRef>,
}
