//! Grounded answer generation.

use crate::history::ConversationTurn;
use crate::types::ChatConfig;
use docchat_core::{AppError, AppResult};
use docchat_knowledge::DocumentChunk;
use docchat_llm::{ChatMessage, LlmClient, LlmRequest};
use docchat_prompt::{build_prompt, FewShotExample, PromptDefinition};
use futures::{Stream, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Reply used when nothing was retrieved; no model call is made.
pub const REFUSAL: &str = "I'm sorry, but I can't answer that from the available documents.";

/// Lazy stream of answer fragments.
///
/// Single pass and single consumer. `None` marks the end of the answer;
/// dropping the stream early abandons it.
pub struct AnswerStream {
    inner: Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>,
}

impl AnswerStream {
    pub fn new(stream: impl Stream<Item = AppResult<String>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// A stream yielding `text` as a single fragment.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(futures::stream::iter([Ok(text.into())]))
    }

    /// Drain the stream into the full answer.
    pub async fn collect_text(mut self) -> AppResult<String> {
        let mut answer = String::new();
        while let Some(fragment) = self.next().await {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }
}

impl Stream for AnswerStream {
    type Item = AppResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for AnswerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerStream").finish_non_exhaustive()
    }
}

/// Answers from retrieved chunks in the configured persona.
pub struct AnswerGenerator {
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    examples: Vec<FewShotExample>,
    persona: String,
    model: String,
    temperature: f32,
}

impl AnswerGenerator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        examples: Vec<FewShotExample>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            llm,
            prompt,
            examples,
            persona: config.persona.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    /// System prompt with the context, few-shot pairs, history, then the
    /// question.
    pub fn build_messages(
        &self,
        question: &str,
        chunks: &[DocumentChunk],
        history: &[ConversationTurn],
    ) -> AppResult<Vec<ChatMessage>> {
        let context = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut variables = HashMap::new();
        variables.insert("persona".to_string(), self.persona.clone());
        variables.insert("context".to_string(), context);
        let system = build_prompt(&self.prompt, variables)?;

        let mut messages = Vec::with_capacity(2 + self.examples.len() * 2 + history.len());
        messages.push(ChatMessage::system(system.text));
        for example in &self.examples {
            messages.push(ChatMessage::user(example.input.clone()));
            messages.push(ChatMessage::assistant(example.answer.clone()));
        }
        messages.extend(history.iter().map(ConversationTurn::to_message));
        messages.push(ChatMessage::user(question));

        Ok(messages)
    }

    /// Start streaming the answer to `question`.
    #[tracing::instrument(skip_all, fields(chunks = chunks.len(), history_turns = history.len()))]
    pub async fn generate(
        &self,
        question: &str,
        chunks: &[DocumentChunk],
        history: &[ConversationTurn],
    ) -> AppResult<AnswerStream> {
        if chunks.is_empty() {
            tracing::info!("No context retrieved, refusing without a model call");
            return Ok(AnswerStream::from_text(REFUSAL));
        }

        tracing::info!("Generating answer");
        let messages = self.build_messages(question, chunks, history)?;
        tracing::debug!(messages = messages.len(), "Answer prompt assembled");

        let request = LlmRequest::from_messages(messages, self.model.clone())
            .with_temperature(self.temperature)
            .with_streaming();
        let stream = self.llm.stream(&request).await?;

        Ok(AnswerStream::new(stream.try_filter_map(|chunk| async move {
            Ok::<_, AppError>((!chunk.content.is_empty()).then_some(chunk.content))
        })))
    }
}
