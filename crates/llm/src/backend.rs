//! OpenAI-compatible backend
//!
//! Works with any `/chat/completions` endpoint: OpenRouter (default),
//! OpenAI, vLLM and local servers.
//!
//! Single-shot calls retry transient failures with exponential backoff.
//! Streaming calls parse the SSE body lazily; dropping the returned stream
//! drops the HTTP response and closes the connection.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use neo_config::LlmSettings;
use neo_core::{CompletionRequest, LanguageModel, TextStream};

use crate::prompt::{ChatMessage, PromptBuilder};
use crate::LlmError;

/// Configuration for OpenAI-compatible backends
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API base URL
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries for transient failures (single-shot only)
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self::from(&LlmSettings::default())
    }
}

impl From<&LlmSettings> for OpenAIConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.resolved_api_key().unwrap_or_default(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: Duration::from_millis(settings.timeout_ms),
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
        }
    }
}

impl OpenAIConfig {
    /// Config for a local OpenAI-compatible server
    pub fn local(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: "not-needed".to_string(),
            model: model.into(),
            ..Default::default()
        }
    }

    fn is_local(&self) -> bool {
        self.endpoint.starts_with("http://localhost") || self.endpoint.starts_with("http://127.0.0.1")
    }
}

/// OpenAI-compatible backend
pub struct OpenAIBackend {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIBackend {
    pub fn new(config: OpenAIConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() && !config.is_local() {
            return Err(LlmError::Configuration(
                "API key required for remote endpoints".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    fn chat_request(&self, request: &CompletionRequest, stream: bool) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: self.config.model.clone(),
            messages: PromptBuilder::from_request(request),
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
            stream: Some(stream),
        }
    }

    /// Send a request and map HTTP failures; 5xx is retryable, 4xx is not
    async fn send(&self, body: &OpenAIChatRequest) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(LlmError::Network(format!("Server error {}: {}", status, error_text)));
            }
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        Ok(response)
    }

    async fn execute_request(&self, body: &OpenAIChatRequest) -> Result<String, LlmError> {
        let response: OpenAIChatResponse = self
            .send(body)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    /// Single-shot completion with retry
    pub async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = self.chat_request(request, false);
        let start = std::time::Instant::now();

        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    attempt,
                    max_retries = self.config.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "LLM request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(&body).await {
                Ok(text) => {
                    tracing::debug!(
                        model = %self.config.model,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        chars = text.len(),
                        "LLM completion finished"
                    );
                    return Ok(text);
                }
                Err(e) if e.is_retryable() => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl LanguageModel for OpenAIBackend {
    async fn complete(&self, request: &CompletionRequest) -> neo_core::Result<String> {
        Ok(self.generate(request).await?)
    }

    fn complete_stream<'a>(&'a self, request: CompletionRequest) -> TextStream<'a> {
        let body = self.chat_request(&request, true);

        Box::pin(async_stream::try_stream! {
            let response = self.send(&body).await.map_err(neo_core::Error::from)?;
            let mut bytes = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            let mut finished = false;

            while !finished {
                let chunk = bytes.next().await;
                let exhausted = chunk.is_none();
                if let Some(chunk) = chunk {
                    let chunk = chunk.map_err(|e| neo_core::Error::from(LlmError::from(e)))?;
                    buffer.extend_from_slice(&chunk);
                }

                while let Some(line) = take_line(&mut buffer, exhausted) {
                    match parse_sse_line(line.trim()) {
                        SseEvent::Delta(text) => yield text,
                        SseEvent::Done => {
                            finished = true;
                            break;
                        }
                        SseEvent::Error(message) => {
                            Err::<(), _>(neo_core::Error::from(LlmError::Api(message)))?;
                        }
                        SseEvent::Ignore => {}
                    }
                }

                if exhausted {
                    break;
                }
            }
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// One parsed server-sent-events line
#[derive(Debug, PartialEq)]
enum SseEvent {
    Delta(String),
    Done,
    Error(String),
    Ignore,
}

/// Next complete line from the buffer, or the unterminated tail once the body has ended
///
/// Only complete lines are decoded mid-stream; a multi-byte char may straddle chunks.
fn take_line(buffer: &mut Vec<u8>, body_ended: bool) -> Option<String> {
    let line: Vec<u8> = match buffer.iter().position(|b| *b == b'\n') {
        Some(line_end) => buffer.drain(..=line_end).collect(),
        None if body_ended && !buffer.is_empty() => std::mem::take(buffer),
        None => return None,
    };
    Some(String::from_utf8_lossy(&line).into_owned())
}

fn parse_sse_line(line: &str) -> SseEvent {
    let Some(payload) = line.strip_prefix("data:") else {
        // Blank separators and ": keep-alive" comments
        return SseEvent::Ignore;
    };
    let payload = payload.trim();

    if payload == "[DONE]" {
        return SseEvent::Done;
    }

    match serde_json::from_str::<OpenAIStreamChunk>(payload) {
        Ok(chunk) => {
            if let Some(error) = chunk.error {
                return SseEvent::Error(error.message);
            }
            chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta)
                .and_then(|d| d.content)
                .filter(|c| !c.is_empty())
                .map(SseEvent::Delta)
                .unwrap_or(SseEvent::Ignore)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Skipping unparseable SSE payload");
            SseEvent::Ignore
        }
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
    #[serde(default)]
    error: Option<OpenAIStreamError>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    delta: Option<OpenAIDelta>,
}

#[derive(Debug, Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OpenAIConfig::default();
        assert_eq!(config.endpoint, "https://openrouter.ai/api/v1");
        assert_eq!(config.model, "openai/gpt-3.5-turbo");
        assert_eq!(config.temperature, 0.7);
    }

    #[test]
    fn test_config_local() {
        let config = OpenAIConfig::local("http://localhost:8000/v1", "llama-3");
        assert_eq!(config.endpoint, "http://localhost:8000/v1");
        assert_eq!(config.api_key, "not-needed");
    }

    #[test]
    fn test_backend_creation() {
        let config = OpenAIConfig::local("http://localhost:8000", "test");
        assert!(OpenAIBackend::new(config).is_ok());

        let config = OpenAIConfig {
            api_key: String::new(),
            endpoint: "https://openrouter.ai/api/v1".to_string(),
            ..OpenAIConfig::local("", "m")
        };
        assert!(matches!(
            OpenAIBackend::new(config),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn test_chat_url() {
        let config = OpenAIConfig::local("http://localhost:8000/v1/", "test");
        let backend = OpenAIBackend::new(config).unwrap();
        assert_eq!(backend.chat_url(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_request_serialization() {
        let backend = OpenAIBackend::new(OpenAIConfig::local("http://localhost:1", "m")).unwrap();
        let request = CompletionRequest::new("sys", "Hello");
        let body = backend.chat_request(&request, true);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Hello");
    }

    #[test]
    fn test_parse_sse_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_sse_line(line), SseEvent::Delta("Hel".to_string()));
    }

    #[test]
    fn test_parse_sse_control_lines() {
        assert_eq!(parse_sse_line("data: [DONE]"), SseEvent::Done);
        assert_eq!(parse_sse_line(""), SseEvent::Ignore);
        assert_eq!(parse_sse_line(": OPENROUTER PROCESSING"), SseEvent::Ignore);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseEvent::Ignore
        );
    }

    #[test]
    fn test_parse_sse_error() {
        let line = r#"data: {"error":{"message":"rate limited"}}"#;
        assert_eq!(parse_sse_line(line), SseEvent::Error("rate limited".to_string()));
    }

    #[test]
    fn test_take_line_waits_for_newline_mid_stream() {
        let mut buffer = b"data: [DONE]\ndata: {\"choi".to_vec();
        assert_eq!(take_line(&mut buffer, false).as_deref(), Some("data: [DONE]\n"));
        assert_eq!(take_line(&mut buffer, false), None);
        assert_eq!(buffer, b"data: {\"choi".to_vec());
    }

    #[test]
    fn test_take_line_flushes_unterminated_tail() {
        let mut buffer = br#"data: {"choices":[{"delta":{"content":"end"}}]}"#.to_vec();
        let line = take_line(&mut buffer, true).unwrap();
        assert_eq!(parse_sse_line(line.trim()), SseEvent::Delta("end".to_string()));
        assert!(buffer.is_empty());
        assert_eq!(take_line(&mut buffer, true), None);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LlmError::Timeout.is_retryable());
        assert!(LlmError::Network("reset".into()).is_retryable());
        assert!(!LlmError::Api("HTTP 401".into()).is_retryable());
    }
}
