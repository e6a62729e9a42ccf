//! Dictionary-based question rewriting.

use crate::types::ChatConfig;
use docchat_core::AppResult;
use docchat_llm::{ChatMessage, LlmClient, LlmRequest};
use docchat_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Normalises user wording with the dictionary before retrieval.
pub struct QuestionRewriter {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    model: String,
    temperature: f32,
}

impl QuestionRewriter {
    /// Render `prompt` with the configured dictionary.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompt: &PromptDefinition,
        config: &ChatConfig,
    ) -> AppResult<Self> {
        let dictionary = config
            .dictionary
            .iter()
            .map(|rule| format!("- {}", rule))
            .collect::<Vec<_>>()
            .join("\n");

        let mut variables = HashMap::new();
        variables.insert("dictionary".to_string(), dictionary);
        let built = build_prompt(prompt, variables)?;

        Ok(Self {
            llm,
            system_prompt: built.text,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Rewrite `question`; a blank reply keeps the question as given.
    #[tracing::instrument(skip(self, question), fields(chars = question.len()))]
    pub async fn rewrite(&self, question: &str) -> AppResult<String> {
        tracing::info!("Rewriting question");

        let request = LlmRequest::from_messages(
            vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(question),
            ],
            self.model.clone(),
        )
        .with_temperature(self.temperature);

        let response = self.llm.complete(&request).await?;
        let rewritten = response.content.trim();

        if rewritten.is_empty() {
            tracing::warn!("Rewriter returned an empty reply, keeping the original question");
            return Ok(question.to_string());
        }

        tracing::debug!(original = question, rewritten, "Question rewritten");
        Ok(rewritten.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_llm::{ChatRole, MockLlmClient, MockReply};
    use docchat_prompt::{builtin_prompt, REWRITE_PROMPT_ID};

    fn rewriter(llm: Arc<MockLlmClient>) -> QuestionRewriter {
        let prompt = builtin_prompt(REWRITE_PROMPT_ID).unwrap();
        QuestionRewriter::new(llm, &prompt, &ChatConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_prompt_carries_dictionary_and_instruction() {
        let llm = Arc::new(MockLlmClient::with_replies([MockReply::text(
            "Can a resident apply twice?",
        )]));
        let rewriter = rewriter(llm.clone());

        let rewritten = rewriter.rewrite("Can a person apply twice?").await.unwrap();
        assert_eq!(rewritten, "Can a resident apply twice?");

        let request = &llm.requests()[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1].role, ChatRole::User);
        assert_eq!(request.messages[1].content, "Can a person apply twice?");
        assert_eq!(request.temperature, Some(0.0));

        let system = request.system_prompt().unwrap();
        assert!(system.contains("- expressions referring to a person -> resident"));
        assert!(system.contains("Do not answer the question"));
        assert!(system.contains("return the question exactly as it was given"));
    }

    #[tokio::test]
    async fn test_unchanged_question_passes_through() {
        // Echo mode returns the question as the model would when no rule applies
        let llm = Arc::new(MockLlmClient::new());
        let rewritten = rewriter(llm)
            .rewrite("When is the deposit deadline?")
            .await
            .unwrap();
        assert_eq!(rewritten, "When is the deposit deadline?");
    }

    #[tokio::test]
    async fn test_blank_reply_falls_back() {
        let llm = Arc::new(MockLlmClient::with_replies([MockReply::text("  \n")]));
        let rewritten = rewriter(llm).rewrite("Who may apply?").await.unwrap();
        assert_eq!(rewritten, "Who may apply?");
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let llm = Arc::new(MockLlmClient::with_replies([MockReply::fail("timeout")]));
        let err = rewriter(llm).rewrite("Who may apply?").await.unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
