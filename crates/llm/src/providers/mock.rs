//! Scripted chat provider for offline runs and tests.
//!
//! Replies are consumed in order; once the script runs out the client
//! echoes the latest user message back. Every request is recorded.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use docchat_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// One scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Successful completion text
    Text(String),
    /// Failure; `stream` surfaces it as an error item inside the stream
    Fail(String),
}

impl MockReply {
    pub fn text(content: impl Into<String>) -> Self {
        MockReply::Text(content.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        MockReply::Fail(message.into())
    }
}

/// Mock chat client.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    /// Client that echoes every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that answers with `replies` in order.
    pub fn with_replies(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Append a reply to the script.
    pub fn push_reply(&self, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_reply(&self, request: &LlmRequest) -> MockReply {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let scripted = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        scripted.unwrap_or_else(|| {
            MockReply::Text(request.last_user_message().unwrap_or_default().to_string())
        })
    }
}

/// Split text into word-sized fragments, keeping the separators.
fn fragments(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        match self.next_reply(request) {
            MockReply::Text(content) => Ok(LlmResponse {
                usage: LlmUsage::new(0, fragments(&content).len() as u32),
                content,
                model: request.model.clone(),
                done: true,
            }),
            MockReply::Fail(message) => Err(AppError::Llm(message)),
        }
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        let model = request.model.clone();

        let items: Vec<AppResult<LlmStreamChunk>> = match self.next_reply(request) {
            MockReply::Text(content) => {
                let parts = fragments(&content);
                let completion_tokens = parts.len() as u32;
                let mut items: Vec<AppResult<LlmStreamChunk>> = parts
                    .into_iter()
                    .map(|content| {
                        Ok(LlmStreamChunk {
                            content,
                            model: model.clone(),
                            done: false,
                            usage: None,
                        })
                    })
                    .collect();
                items.push(Ok(LlmStreamChunk {
                    content: String::new(),
                    model,
                    done: true,
                    usage: Some(LlmUsage::new(0, completion_tokens)),
                }));
                items
            }
            MockReply::Fail(message) => vec![Err(AppError::Llm(message))],
        };

        Ok(Box::pin(futures::stream::iter(items)))
    }
}
