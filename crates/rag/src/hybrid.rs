//! Hybrid scoring
//!
//! Blends vector similarity from the search collaborator with keyword
//! overlap computed locally:
//!
//! `final = clamp(wv * vector + wk * keyword, 0, 1)`
//!
//! Ties keep the collaborator's original rank.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use neo_config::RagConfig;
use neo_core::{HybridResult, RetrievalMatch, VectorSearch};

use crate::keywords::KeywordExtractor;
use crate::RagError;

/// Blend weights; validated to lie in [0, 1] and sum to 1 by the config layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridWeights {
    pub vector: f32,
    pub keyword: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self::from(&RagConfig::default())
    }
}

impl From<&RagConfig> for HybridWeights {
    fn from(config: &RagConfig) -> Self {
        Self {
            vector: config.vector_weight,
            keyword: config.keyword_weight,
        }
    }
}

impl HybridWeights {
    pub fn combine(&self, vector_score: f32, keyword_score: f32) -> f32 {
        (self.vector * vector_score + self.keyword * keyword_score).clamp(0.0, 1.0)
    }
}

pub struct HybridScorer {
    search: Arc<dyn VectorSearch>,
    extractor: Arc<KeywordExtractor>,
    weights: HybridWeights,
    retries: u32,
    initial_backoff: Duration,
}

impl HybridScorer {
    pub fn new(
        search: Arc<dyn VectorSearch>,
        extractor: Arc<KeywordExtractor>,
        config: &RagConfig,
    ) -> Self {
        Self {
            search,
            extractor,
            weights: HybridWeights::from(config),
            retries: config.search_retries,
            initial_backoff: Duration::from_millis(config.search_backoff_ms),
        }
    }

    /// Ranked hybrid results for `query`, at most `top_k`
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<HybridResult>, RagError> {
        let matches = self.vector_search(query, top_k).await?;
        let keywords = self.extractor.extract(query);

        let mut results: Vec<HybridResult> = matches
            .into_iter()
            .take(top_k)
            .map(|m| self.score_match(&keywords, m))
            .collect();

        // sort_by is stable: equal scores keep vector rank
        results.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
        });

        tracing::debug!(
            query = %query,
            keywords = keywords.len(),
            results = results.len(),
            best = results.first().map(|r| r.final_score),
            "Hybrid search complete"
        );

        Ok(results)
    }

    fn score_match(&self, keywords: &[String], m: RetrievalMatch) -> HybridResult {
        let vector_score = m.vector_score.clamp(0.0, 1.0);
        let keyword_score = match m.metadata.text.as_deref() {
            Some(text) => self.extractor.score(keywords, text),
            None => 0.0,
        };

        HybridResult {
            id: m.id,
            vector_score,
            keyword_score,
            final_score: self.weights.combine(vector_score, keyword_score),
            metadata: m.metadata,
        }
    }

    /// Vector search with bounded retry and doubling backoff
    async fn vector_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>, RagError> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 0;

        loop {
            match self.search.search(query, top_k).await {
                Ok(matches) => return Ok(matches),
                Err(e) if attempt < self.retries && e.is_transient() => {
                    attempt += 1;
                    tracing::warn!(
                        backend = self.search.name(),
                        error = %e,
                        attempt,
                        max_retries = self.retries,
                        "Vector search failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    tracing::error!(backend = self.search.name(), error = %e, "Vector search failed");
                    return Err(RagError::VectorSearch(e.to_string()));
                }
            }
        }
    }
}
