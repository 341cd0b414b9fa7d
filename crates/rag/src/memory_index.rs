//! In-memory vector index
//!
//! Brute-force cosine search over hashed embeddings. Suitable for small
//! corpora loaded from knowledge files.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;

use neo_core::{MatchMetadata, RetrievalMatch, VectorSearch};

use crate::embeddings::{cosine_similarity, HashEmbedder};

struct IndexedChunk {
    id: String,
    embedding: Vec<f32>,
    metadata: MatchMetadata,
}

pub struct InMemoryVectorIndex {
    embedder: HashEmbedder,
    chunks: RwLock<Vec<IndexedChunk>>,
}

impl InMemoryVectorIndex {
    pub fn new(embedder: HashEmbedder) -> Self {
        Self {
            embedder,
            chunks: RwLock::new(Vec::new()),
        }
    }

    /// Insert or replace a chunk; title and text are embedded together
    pub fn upsert(&self, id: impl Into<String>, metadata: MatchMetadata) {
        let id = id.into();
        let embed_text = match (&metadata.title, &metadata.text) {
            (Some(title), Some(text)) => format!("{}\n{}", title, text),
            (None, Some(text)) => text.clone(),
            (Some(title), None) => title.clone(),
            (None, None) => String::new(),
        };
        let chunk = IndexedChunk {
            embedding: self.embedder.embed(&embed_text),
            id,
            metadata,
        };

        let mut chunks = self.chunks.write();
        match chunks.iter_mut().find(|c| c.id == chunk.id) {
            Some(existing) => *existing = chunk,
            None => chunks.push(chunk),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    pub fn clear(&self) {
        self.chunks.write().clear();
    }

    fn query(&self, query: &str, top_k: usize) -> Vec<RetrievalMatch> {
        let query_embedding = self.embedder.embed(query);
        let chunks = self.chunks.read();

        let mut scored: Vec<RetrievalMatch> = chunks
            .iter()
            .map(|c| {
                RetrievalMatch::new(
                    c.id.clone(),
                    cosine_similarity(&query_embedding, &c.embedding),
                    c.metadata.clone(),
                )
            })
            .collect();

        scored.sort_by(|a, b| {
            b.vector_score
                .partial_cmp(&a.vector_score)
                .unwrap_or(Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }
}

#[async_trait]
impl VectorSearch for InMemoryVectorIndex {
    async fn search(&self, query: &str, top_k: usize) -> neo_core::Result<Vec<RetrievalMatch>> {
        Ok(self.query(query, top_k))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> InMemoryVectorIndex {
        let index = InMemoryVectorIndex::new(HashEmbedder::new(384));
        index.upsert(
            "orion",
            MatchMetadata::new("Orion is the request router of Cogneoverse.")
                .with_title("Orion")
                .with_source("orion.md"),
        );
        index.upsert(
            "spline",
            MatchMetadata::new("Spline renders 3D scenes in the browser.").with_title("Spline"),
        );
        index.upsert("budget", MatchMetadata::new("Quarterly marketing budget figures."));
        index
    }

    #[tokio::test]
    async fn test_search_ranks_relevant_first() {
        let index = index();
        let results = index.search("what does orion route", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "orion");
        assert!(results[0].vector_score > results[1].vector_score);
        assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.vector_score)));
        assert_eq!(results[0].metadata.source.as_deref(), Some("orion.md"));
    }

    #[test]
    fn test_upsert_replaces() {
        let index = index();
        assert_eq!(index.len(), 3);
        index.upsert("orion", MatchMetadata::new("replaced"));
        assert_eq!(index.len(), 3);
        index.clear();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_empty_index() {
        let index = InMemoryVectorIndex::new(HashEmbedder::new(32));
        assert!(index.search("anything", 5).await.unwrap().is_empty());
        assert_eq!(index.name(), "in-memory");
    }
}
