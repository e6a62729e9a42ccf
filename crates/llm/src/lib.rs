//! Chat-model integration crate for docchat.
//!
//! A provider-agnostic abstraction over chat-completion models, with
//! one-shot and streamed completions behind the `LlmClient` trait.
//!
//! # Providers
//! - **OpenAI**: `/v1/chat/completions` with server-sent events
//! - **Ollama**: local runtime, `/api/chat` with NDJSON streaming
//! - **Mock**: scripted replies for offline runs and tests
//!
//! # Example
//! ```no_run
//! use docchat_llm::{ChatMessage, LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::from_messages(
//!     vec![ChatMessage::system("Be brief."), ChatMessage::user("Hello!")],
//!     "llama3.2",
//! );
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
mod stream;
pub mod types;

pub use client::{
    ChatMessage, ChatRole, LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk,
    LlmUsage,
};
pub use factory::create_client;
pub use providers::{MockLlmClient, MockReply, OllamaClient, OpenAiClient};
pub use types::ProviderType;
