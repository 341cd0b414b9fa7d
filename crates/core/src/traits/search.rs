//! Vector search trait

use async_trait::async_trait;

use crate::{Result, RetrievalMatch};

/// Embedding + vector search collaborator
///
/// Implementations embed the query and return up to `top_k` matches with
/// similarity in [0, 1], best first.
#[async_trait]
pub trait VectorSearch: Send + Sync + 'static {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalMatch>>;

    /// Name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchMetadata;

    struct FixedSearch;

    #[async_trait]
    impl VectorSearch for FixedSearch {
        async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<RetrievalMatch>> {
            let all = vec![
                RetrievalMatch::new("a", 0.9, MatchMetadata::new("alpha")),
                RetrievalMatch::new("b", 0.5, MatchMetadata::new("beta")),
            ];
            Ok(all.into_iter().take(top_k).collect())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let search = FixedSearch;
        let results = search.search("anything", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
        assert_eq!(search.name(), "fixed");
    }
}
