//! Retrieval match and scoring types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Retrieval intent derived from a user message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    General,
    RagStrong,
    RagWeak,
}

impl Mode {
    /// Whether this mode asks for retrieval at all
    pub fn wants_retrieval(&self) -> bool {
        !matches!(self, Mode::General)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::General => "general",
            Mode::RagStrong => "rag_strong",
            Mode::RagWeak => "rag_weak",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload attached to an indexed chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Any other payload fields the index carries
    #[serde(default, flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl MatchMetadata {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A candidate returned by the vector-search collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub id: String,
    /// Similarity in [0, 1]
    pub vector_score: f32,
    pub metadata: MatchMetadata,
}

impl RetrievalMatch {
    pub fn new(id: impl Into<String>, vector_score: f32, metadata: MatchMetadata) -> Self {
        Self {
            id: id.into(),
            vector_score,
            metadata,
        }
    }
}

/// A candidate after lexical and vector scores are blended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridResult {
    pub id: String,
    pub vector_score: f32,
    pub keyword_score: f32,
    pub final_score: f32,
    pub metadata: MatchMetadata,
}

/// Attribution entry returned alongside a grounded answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub title: String,
    pub source: String,
    /// Score rounded to 3 decimals
    pub score: f32,
}

impl SourceRecord {
    pub const UNKNOWN: &'static str = "Unknown";

    /// Build from optional metadata fields, defaulting missing ones to "Unknown"
    pub fn from_metadata(metadata: &MatchMetadata, score: f32) -> Self {
        Self {
            title: metadata
                .title
                .clone()
                .unwrap_or_else(|| Self::UNKNOWN.to_string()),
            source: metadata
                .source
                .clone()
                .unwrap_or_else(|| Self::UNKNOWN.to_string()),
            score: round3(score),
        }
    }
}

fn round3(score: f32) -> f32 {
    (score * 1000.0).round() / 1000.0
}
