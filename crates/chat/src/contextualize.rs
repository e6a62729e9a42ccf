//! Standalone questions from chat history, then retrieval.

use crate::history::ConversationTurn;
use crate::types::ChatConfig;
use docchat_core::AppResult;
use docchat_knowledge::{DocumentChunk, MmrRetriever};
use docchat_llm::{ChatMessage, LlmClient, LlmRequest};
use docchat_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Chunks found for a question, with the question actually searched.
#[derive(Debug, Clone)]
pub struct ContextualRetrieval {
    pub standalone_question: String,
    pub chunks: Vec<DocumentChunk>,
}

/// Resolves references to earlier turns before searching the collection.
pub struct HistoryAwareRetriever {
    llm: Arc<dyn LlmClient>,
    instruction: String,
    retriever: MmrRetriever,
    model: String,
    temperature: f32,
}

impl HistoryAwareRetriever {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompt: &PromptDefinition,
        retriever: MmrRetriever,
        config: &ChatConfig,
    ) -> AppResult<Self> {
        let instruction = build_prompt(prompt, HashMap::new())?.text;

        Ok(Self {
            llm,
            instruction,
            retriever,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Reformulate `question` so it stands without `history`.
    ///
    /// The model is consulted even when the history is empty. A blank reply
    /// keeps the question as given.
    #[tracing::instrument(skip(self, question, history), fields(history_turns = history.len()))]
    pub async fn standalone_question(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> AppResult<String> {
        tracing::info!("Forming standalone question");

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.instruction.clone()));
        messages.extend(history.iter().map(ConversationTurn::to_message));
        messages.push(ChatMessage::user(question));

        let request = LlmRequest::from_messages(messages, self.model.clone())
            .with_temperature(self.temperature);
        let response = self.llm.complete(&request).await?;

        let standalone = response.content.trim();
        if standalone.is_empty() {
            return Ok(question.to_string());
        }

        tracing::debug!(standalone, "Standalone question formed");
        Ok(standalone.to_string())
    }

    /// Standalone question plus the chunks retrieved for it.
    pub async fn retrieve_in_context(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> AppResult<ContextualRetrieval> {
        let standalone_question = self.standalone_question(question, history).await?;
        let chunks = self.retriever.retrieve(&standalone_question).await?;

        Ok(ContextualRetrieval {
            standalone_question,
            chunks,
        })
    }

    pub async fn retrieve(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> AppResult<Vec<DocumentChunk>> {
        Ok(self.retrieve_in_context(question, history).await?.chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_knowledge::embeddings::providers::MockProvider;
    use docchat_knowledge::{EmbeddingProvider, InMemoryIndex, RetrievalParams, VectorIndex};
    use docchat_llm::{ChatRole, MockLlmClient, MockReply};
    use docchat_prompt::{builtin_prompt, CONTEXTUALIZE_PROMPT_ID};

    async fn retriever(texts: &[&str]) -> MmrRetriever {
        let embedder = Arc::new(MockProvider::new(64));
        let index = Arc::new(InMemoryIndex::new("docs"));

        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let vectors = embedder.embed_batch(&owned).await.unwrap();
        let chunks: Vec<DocumentChunk> = owned
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, embedding))| DocumentChunk {
                id: format!("c{}", i),
                text,
                source: "notice.pdf".to_string(),
                page: i as u32 + 1,
                position: i as u32,
                metadata: serde_json::json!({}),
                embedding: Some(embedding),
            })
            .collect();
        index.add_chunks(&chunks).await.unwrap();

        MmrRetriever::new(index, embedder, RetrievalParams::default())
    }

    async fn transformer(llm: Arc<MockLlmClient>, texts: &[&str]) -> HistoryAwareRetriever {
        let prompt = builtin_prompt(CONTEXTUALIZE_PROMPT_ID).unwrap();
        HistoryAwareRetriever::new(llm, &prompt, retriever(texts).await, &ChatConfig::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_history_sent_between_instruction_and_question() {
        let llm = Arc::new(MockLlmClient::with_replies([MockReply::text(
            "When is the deposit for the studio apartment due?",
        )]));
        let transformer = transformer(llm.clone(), &[]).await;

        let history = vec![
            ConversationTurn::user("How much is the studio apartment deposit?"),
            ConversationTurn::assistant("The deposit is 3 million won."),
        ];
        let standalone = transformer
            .standalone_question("When is it due?", &history)
            .await
            .unwrap();
        assert_eq!(standalone, "When is the deposit for the studio apartment due?");

        let request = &llm.requests()[0];
        let roles: Vec<ChatRole> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::User]
        );
        assert!(request
            .system_prompt()
            .unwrap()
            .contains("Do NOT answer the question"));
        assert_eq!(request.last_user_message(), Some("When is it due?"));
    }

    #[tokio::test]
    async fn test_model_called_with_empty_history() {
        let llm = Arc::new(MockLlmClient::new());
        let transformer = transformer(llm.clone(), &[]).await;

        let standalone = transformer
            .standalone_question("Who may apply?", &[])
            .await
            .unwrap();
        assert_eq!(standalone, "Who may apply?");
        assert_eq!(llm.request_count(), 1);
    }

    #[tokio::test]
    async fn test_retrieves_with_standalone_question() {
        let llm = Arc::new(MockLlmClient::with_replies([MockReply::text(
            "When is the deposit deadline?",
        )]));
        let transformer = transformer(
            llm,
            &[
                "Parking spaces are assigned by lottery.",
                "The deposit deadline is April 30.",
            ],
        )
        .await;

        let result = transformer
            .retrieve_in_context("And when is that due?", &[])
            .await
            .unwrap();
        assert_eq!(result.standalone_question, "When is the deposit deadline?");
        assert_eq!(result.chunks[0].text, "The deposit deadline is April 30.");
    }
}
