//! Error types shared across the workspace

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
///
/// Each crate keeps its own error enum and converts into this one at
/// the crate boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Retrieval error: {0}")]
    Rag(String),

    #[error("Vector search error: {0}")]
    VectorSearch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

}

impl Error {
    /// Whether retrying the same operation could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::VectorSearch(_) | Error::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Timeout(1500);
        assert_eq!(err.to_string(), "Request timed out after 1500ms");

        let err = Error::Llm("upstream 502".to_string());
        assert!(err.to_string().contains("upstream 502"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::VectorSearch("connection reset".into()).is_transient());
        assert!(!Error::InvalidRequest("empty message".into()).is_transient());
        assert!(!Error::Llm("bad request".into()).is_transient());
    }
}
