//! Language Model traits

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::{CompletionRequest, Result};

/// Lazily produced text chunks from a streamed completion
pub type TextStream<'a> = Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>>;

/// Language Model interface
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = Arc::new(OpenAIBackend::new(config)?);
/// let request = CompletionRequest::new("You are Neo", "hi there");
/// let text = llm.complete(&request).await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Single-shot completion
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Streamed completion
    ///
    /// The stream is finite. Dropping it must release the upstream request.
    fn complete_stream<'a>(&'a self, request: CompletionRequest) -> TextStream<'a>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct EchoLlm;

    #[async_trait]
    impl LanguageModel for EchoLlm {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            Ok(format!("echo: {}", request.user_message))
        }

        fn complete_stream<'a>(&'a self, request: CompletionRequest) -> TextStream<'a> {
            let words: Vec<Result<String>> = request
                .user_message
                .split_whitespace()
                .map(|w| Ok(w.to_string()))
                .collect();
            Box::pin(futures::stream::iter(words))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_mock_llm() {
        let llm = EchoLlm;
        let request = CompletionRequest::new("system", "hello world");
        assert_eq!(llm.complete(&request).await.unwrap(), "echo: hello world");

        let chunks: Vec<String> = llm
            .complete_stream(request)
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["hello", "world"]);
        assert_eq!(llm.model_name(), "echo");
    }
}
