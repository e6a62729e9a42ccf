//! Conversational retrieval-augmented answering.
//!
//! Each turn runs rewrite, contextualize and retrieve, then generate. The
//! session transcript gains the original question and the assembled answer
//! only once the answer stream has been drained without error.

use crate::answer::{AnswerGenerator, AnswerStream};
use crate::contextualize::HistoryAwareRetriever;
use crate::history::SessionHistoryStore;
use crate::rewrite::QuestionRewriter;
use crate::types::{ChatAnswer, ChatConfig, SourceRef};
use docchat_core::{AppError, AppResult};
use docchat_knowledge::MmrRetriever;
use docchat_llm::LlmClient;
use docchat_prompt::{
    builtin_prompt, default_examples, load_examples, load_prompt_or_builtin, FewShotExample,
    PromptDefinition, ANSWER_PROMPT_ID, CONTEXTUALIZE_PROMPT_ID, REWRITE_PROMPT_ID,
};
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;

/// Prompts and examples used by one pipeline.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub rewrite: PromptDefinition,
    pub contextualize: PromptDefinition,
    pub answer: PromptDefinition,
    pub examples: Vec<FewShotExample>,
}

impl PromptSet {
    /// The built-in prompts and examples.
    pub fn builtin() -> AppResult<Self> {
        let get = |id: &str| {
            builtin_prompt(id).ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", id)))
        };

        Ok(Self {
            rewrite: get(REWRITE_PROMPT_ID)?,
            contextualize: get(CONTEXTUALIZE_PROMPT_ID)?,
            answer: get(ANSWER_PROMPT_ID)?,
            examples: default_examples(),
        })
    }

    /// Built-ins overridden by `.docchat/prompts/` in `workspace`.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            rewrite: load_prompt_or_builtin(workspace, REWRITE_PROMPT_ID)?,
            contextualize: load_prompt_or_builtin(workspace, CONTEXTUALIZE_PROMPT_ID)?,
            answer: load_prompt_or_builtin(workspace, ANSWER_PROMPT_ID)?,
            examples: load_examples(workspace)?,
        })
    }
}

/// A turn in progress: what was searched, what was found, and the answer
/// still to be streamed.
#[derive(Debug)]
pub struct ChatTurn {
    pub rewritten_question: String,
    pub standalone_question: String,
    pub sources: Vec<SourceRef>,
    pub answer: AnswerStream,
}

/// Rewriter, history-aware retriever and generator over a shared history.
pub struct ConversationalRag {
    rewriter: QuestionRewriter,
    retriever: HistoryAwareRetriever,
    generator: AnswerGenerator,
    history: Arc<SessionHistoryStore>,
}

impl ConversationalRag {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        retriever: MmrRetriever,
        prompts: PromptSet,
        config: &ChatConfig,
        history: Arc<SessionHistoryStore>,
    ) -> AppResult<Self> {
        Ok(Self {
            rewriter: QuestionRewriter::new(llm.clone(), &prompts.rewrite, config)?,
            retriever: HistoryAwareRetriever::new(
                llm.clone(),
                &prompts.contextualize,
                retriever,
                config,
            )?,
            generator: AnswerGenerator::new(llm, prompts.answer, prompts.examples, config),
            history,
        })
    }

    pub fn history(&self) -> &Arc<SessionHistoryStore> {
        &self.history
    }

    /// Run every step up to generation and hand back the pending answer.
    #[tracing::instrument(skip(self, user_message))]
    pub async fn begin(&self, session_id: &str, user_message: &str) -> AppResult<ChatTurn> {
        tracing::info!("Answering question");

        let rewritten_question = self.rewriter.rewrite(user_message).await?;
        let history = self.history.transcript(session_id).await;

        let retrieval = self
            .retriever
            .retrieve_in_context(&rewritten_question, &history)
            .await?;
        let sources = retrieval.chunks.iter().map(SourceRef::from).collect();

        let fragments = self
            .generator
            .generate(&rewritten_question, &retrieval.chunks, &history)
            .await?;

        let store = self.history.clone();
        let session = session_id.to_string();
        let question = user_message.to_string();

        let answer = AnswerStream::new(async_stream::try_stream! {
            let mut fragments = fragments;
            let mut full = String::new();

            while let Some(fragment) = fragments.next().await {
                let fragment = fragment?;
                full.push_str(&fragment);
                yield fragment;
            }

            store.append_exchange(&session, &question, &full).await;
            tracing::debug!(session_id = %session, chars = full.len(), "Answer recorded");
        });

        Ok(ChatTurn {
            rewritten_question,
            standalone_question: retrieval.standalone_question,
            sources,
            answer,
        })
    }

    /// Stream the answer to `user_message` in `session_id`.
    pub async fn stream(&self, session_id: &str, user_message: &str) -> AppResult<AnswerStream> {
        Ok(self.begin(session_id, user_message).await?.answer)
    }

    /// Answer without streaming.
    pub async fn answer(&self, session_id: &str, user_message: &str) -> AppResult<ChatAnswer> {
        let turn = self.begin(session_id, user_message).await?;
        let answer = turn.answer.collect_text().await?;

        Ok(ChatAnswer {
            answer,
            rewritten_question: turn.rewritten_question,
            standalone_question: turn.standalone_question,
            sources: turn.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_core::config::STATE_DIR;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_prompt_set() {
        let prompts = PromptSet::builtin().unwrap();
        assert_eq!(prompts.rewrite.id, REWRITE_PROMPT_ID);
        assert_eq!(prompts.contextualize.id, CONTEXTUALIZE_PROMPT_ID);
        assert_eq!(prompts.answer.id, ANSWER_PROMPT_ID);
        assert_eq!(prompts.examples, default_examples());
    }

    #[test]
    fn test_workspace_overrides_answer_prompt() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(STATE_DIR).join("prompts");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("rag.answer.yml"),
            "id: rag.answer\ntitle: Terse\napiVersion: \"1.0\"\ncreatedBy: ops\n\
             variables: [context]\ntemplate: \"Answer in one sentence.\\n{{context}}\"\n",
        )
        .unwrap();

        let prompts = PromptSet::load(temp.path()).unwrap();
        assert_eq!(prompts.answer.title, "Terse");
        assert_eq!(prompts.rewrite, PromptSet::builtin().unwrap().rewrite);
    }
}
