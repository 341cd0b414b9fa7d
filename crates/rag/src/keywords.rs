//! Keyword extraction and lexical scoring
//!
//! Keywords are lowercase tokens that survive stopword filtering. Domain
//! terms are always kept, whatever their length, and earn a bounded boost
//! when scoring a candidate text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use neo_config::constants::rag::{DOMAIN_BOOST_FACTOR, MAX_DOMAIN_BOOST};
use neo_config::VocabularyConfig;

/// Anything that is not a word character, whitespace or hyphen
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());

/// Minimum length for a token to be considered at all
const MIN_TOKEN_CHARS: usize = 2;
/// Minimum length for an ordinary (non-domain) keyword
const MIN_KEYWORD_CHARS: usize = 3;

#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    stopwords: HashSet<String>,
    domain_terms: HashSet<String>,
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(&VocabularyConfig::default())
    }
}

impl KeywordExtractor {
    pub fn new(vocabulary: &VocabularyConfig) -> Self {
        Self {
            stopwords: vocabulary.stopwords.iter().cloned().collect(),
            domain_terms: vocabulary.domain_terms.iter().cloned().collect(),
        }
    }

    pub fn is_domain_term(&self, token: &str) -> bool {
        self.domain_terms.contains(token)
    }

    /// Ordered, deduplicated keywords in first-occurrence order
    pub fn extract(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let normalized = NON_WORD.replace_all(&lowered, " ");

        let mut keywords = Vec::new();
        let mut seen = HashSet::new();

        for token in normalized.split_whitespace() {
            if seen.contains(token) {
                continue;
            }

            let keep = if self.is_domain_term(token) {
                true
            } else {
                let chars = token.chars().count();
                chars >= MIN_TOKEN_CHARS
                    && !self.stopwords.contains(token)
                    && chars >= MIN_KEYWORD_CHARS
            };

            if keep {
                seen.insert(token.to_string());
                keywords.push(token.to_string());
            }
        }

        keywords
    }

    /// Keyword overlap score in [0, 1]
    ///
    /// base = matched / total; domain boost = min(0.2, domain_matched / total * 0.3).
    pub fn score(&self, keywords: &[String], text: &str) -> f32 {
        if keywords.is_empty() {
            return 0.0;
        }

        let text_lower = text.to_lowercase();
        let mut matched = 0usize;
        let mut domain_matched = 0usize;

        for keyword in keywords {
            if text_lower.contains(keyword.as_str()) {
                matched += 1;
                if self.is_domain_term(keyword) {
                    domain_matched += 1;
                }
            }
        }

        let total = keywords.len() as f32;
        let base = matched as f32 / total;
        let boost = (domain_matched as f32 / total * DOMAIN_BOOST_FACTOR).min(MAX_DOMAIN_BOOST);

        (base + boost).min(1.0)
    }

    /// True iff any keyword occurs in the text
    pub fn has_match(&self, keywords: &[String], text: &str) -> bool {
        let text_lower = text.to_lowercase();
        keywords.iter().any(|k| text_lower.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_extract_filters_stopwords() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("I'm bored, tell me about Cogneoverse architecture!");

        assert!(keywords.contains(&"cogneoverse".to_string()));
        assert!(keywords.contains(&"architecture".to_string()));
        assert!(keywords.contains(&"bored".to_string()));
        for excluded in ["i'm", "i", "m", "tell", "me", "about"] {
            assert!(!keywords.contains(&excluded.to_string()), "{excluded} kept");
        }
    }

    #[test]
    fn test_extract_keeps_order_and_dedups() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("Orion pipeline, orion PIPELINE spline");
        assert_eq!(keywords, kw(&["orion", "pipeline", "spline"]));
    }

    #[test]
    fn test_short_domain_terms_survive() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("ai ml ok go");
        // "ok" is two chars and not a domain term; "go" is a stopword
        assert_eq!(keywords, kw(&["ai", "ml"]));
    }

    #[test]
    fn test_hyphens_preserved() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("multi-hop retrieval.");
        assert_eq!(keywords, kw(&["multi-hop", "retrieval"]));
    }

    #[test]
    fn test_unicode_word_chars() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("Überblick: café");
        assert_eq!(keywords, kw(&["überblick", "café"]));
    }

    #[test]
    fn test_score_full_domain_match() {
        let extractor = KeywordExtractor::default();
        let score = extractor.score(
            &kw(&["cogneoverse", "architecture"]),
            "Cogneoverse architecture overview",
        );
        assert!(score >= 0.9);
        assert!(score <= 1.0);
    }

    #[test]
    fn test_score_partial_and_boost_cap() {
        let extractor = KeywordExtractor::default();

        // 1 of 2 matched, no domain terms
        let score = extractor.score(&kw(&["pipeline", "latency"]), "the pipeline is fast");
        assert!((score - 0.5).abs() < 1e-6);

        // 1 of 2 matched, domain term: 0.5 + min(0.2, 0.5 * 0.3) = 0.65
        let score = extractor.score(&kw(&["orion", "latency"]), "orion routes requests");
        assert!((score - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_score_empty_keywords() {
        let extractor = KeywordExtractor::default();
        assert_eq!(extractor.score(&[], "anything"), 0.0);
    }

    #[test]
    fn test_has_match() {
        let extractor = KeywordExtractor::default();
        assert!(extractor.has_match(&kw(&["spline"]), "About SPLINE"));
        assert!(!extractor.has_match(&kw(&["spline"]), "about orion"));
        assert!(!extractor.has_match(&[], "about orion"));
    }
}
