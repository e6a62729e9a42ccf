//! Chat-model provider implementations.

pub mod mock;
pub mod ollama;
pub mod openai;

pub use mock::{MockLlmClient, MockReply};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use docchat_core::{AppError, AppResult};

/// Turn a non-success HTTP response into an `AppError::Llm`.
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AppError::Llm(format!(
        "{} API error ({}): {}",
        provider, status, error_text
    )))
}
