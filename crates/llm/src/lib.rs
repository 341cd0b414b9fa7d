//! Language model integration
//!
//! Features:
//! - OpenAI-compatible backend (OpenRouter by default), single-shot and SSE streaming
//! - Prompt templates for general, grounded and query-decomposition calls
//! - Fenced-JSON output parsing

pub mod backend;
pub mod output;
pub mod prompt;
pub mod templates;

pub use backend::{OpenAIBackend, OpenAIConfig};
pub use output::{parse_json_output, strip_code_fence};
pub use prompt::{ChatMessage, PromptBuilder, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(String),
}

impl LlmError {
    /// Network failures, timeouts and 5xx responses are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for neo_core::Error {
    fn from(err: LlmError) -> Self {
        neo_core::Error::Llm(err.to_string())
    }
}
