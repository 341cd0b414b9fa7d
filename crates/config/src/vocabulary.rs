//! Lexical vocabulary tables
//!
//! Trigger words for mode classification, stopwords and domain terms for
//! keyword extraction. Loaded from the `vocabulary` section of the settings
//! or from a standalone YAML file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

const STRONG_TRIGGERS: &[&str] = &["cogneoverse", "neo", "orion"];

const WEAK_TRIGGERS: &[&str] = &[
    "internal",
    "architecture",
    "system",
    "project",
    "documentation",
    "docs",
];

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "he", "in",
    "is", "it", "its", "of", "on", "or", "she", "that", "the", "their", "them", "there", "they",
    "this", "to", "was", "were", "what", "when", "where", "which", "who", "will", "with", "would",
    "you", "your", "can", "could", "do", "does", "did", "had", "how", "if", "may", "me", "my",
    "no", "not", "our", "out", "so", "some", "than", "then", "these", "those", "up", "very", "we",
    "why", "about", "after", "all", "also", "any", "back", "because", "been", "before", "but",
    "each", "even", "get", "give", "go", "here", "into", "just", "know", "like", "make", "more",
    "most", "much", "must", "new", "now", "only", "other", "over", "own", "same", "see",
    "should", "such", "take", "tell", "through", "under", "use", "want", "way", "well", "work",
    "i", "am", "im", "i'm", "please", "thanks", "thank", "hello", "hi", "hey", "explain",
    "describe", "show",
];

const DOMAIN_TERMS: &[&str] = &[
    "cogneoverse", "cogneo", "neo", "orion", "spline", "rag", "llm", "embedding", "vector",
    "pinecone", "ai", "ml", "api", "agent", "cognition", "neural", "transformer", "architecture",
    "system", "internal", "documentation", "docs", "project", "module", "component", "service",
    "mind", "ayush", "shreyash", "jay",
];

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn default_strong_triggers() -> Vec<String> {
    owned(STRONG_TRIGGERS)
}
fn default_weak_triggers() -> Vec<String> {
    owned(WEAK_TRIGGERS)
}
fn default_stopwords() -> Vec<String> {
    owned(STOPWORDS)
}
fn default_domain_terms() -> Vec<String> {
    owned(DOMAIN_TERMS)
}

/// Vocabulary used by the classifier and the keyword extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Any of these as a substring selects strong retrieval intent
    #[serde(default = "default_strong_triggers")]
    pub strong_triggers: Vec<String>,

    /// Any of these as a substring selects weak retrieval intent
    #[serde(default = "default_weak_triggers")]
    pub weak_triggers: Vec<String>,

    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,

    /// Always kept as keywords and boosted in keyword scoring
    #[serde(default = "default_domain_terms")]
    pub domain_terms: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            strong_triggers: default_strong_triggers(),
            weak_triggers: default_weak_triggers(),
            stopwords: default_stopwords(),
            domain_terms: default_domain_terms(),
        }
    }
}

impl VocabularyConfig {
    /// Load from a YAML file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        let vocab: Self = serde_yaml::from_str(&content)?;
        vocab.validate()?;
        tracing::info!(
            path = %path.display(),
            strong = vocab.strong_triggers.len(),
            weak = vocab.weak_triggers.len(),
            stopwords = vocab.stopwords.len(),
            domain_terms = vocab.domain_terms.len(),
            "Loaded vocabulary"
        );
        Ok(vocab)
    }

    /// Entries must be non-empty and lowercase; matching is case-folded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tables = [
            ("vocabulary.strong_triggers", &self.strong_triggers),
            ("vocabulary.weak_triggers", &self.weak_triggers),
            ("vocabulary.stopwords", &self.stopwords),
            ("vocabulary.domain_terms", &self.domain_terms),
        ];
        for (field, words) in tables {
            if let Some(bad) = words
                .iter()
                .find(|w| w.trim().is_empty() || w.to_lowercase() != **w)
            {
                return Err(ConfigError::invalid(
                    field,
                    format!("entries must be non-empty lowercase, got {:?}", bad),
                ));
            }
        }
        Ok(())
    }
}
