//! Retrieval decision pipeline
//!
//! Features:
//! - Keyword extraction with stopword filtering and domain-term boosting
//! - Trigger-word mode classification (general / rag_strong / rag_weak)
//! - Hybrid scoring of vector matches with keyword overlap
//! - Grounding gate and context extraction
//! - Bounded multi-hop query decomposition
//! - In-memory vector index with hashed embeddings and a YAML/JSON knowledge loader

pub mod embeddings;
pub mod gate;
pub mod hybrid;
pub mod keywords;
pub mod knowledge_loader;
pub mod memory_index;
pub mod multihop;
pub mod router;

pub use embeddings::HashEmbedder;
pub use gate::{
    best_score, extract_context, should_use_rag, GroundedContext, GroundingGate, Scored,
    CONTEXT_SEPARATOR,
};
pub use hybrid::{HybridScorer, HybridWeights};
pub use keywords::KeywordExtractor;
pub use knowledge_loader::{KnowledgeDocument, KnowledgeFile, KnowledgeLoader};
pub use memory_index::InMemoryVectorIndex;
pub use multihop::{JudgeVerdict, MultiHopConfig, MultiHopOrchestrator, MultiHopOutcome};
pub use router::ModeClassifier;

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector search error: {0}")]
    VectorSearch(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Judge error: {0}")]
    Judge(String),
}

impl From<RagError> for neo_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::VectorSearch(msg) => neo_core::Error::VectorSearch(msg),
            other => neo_core::Error::Rag(other.to_string()),
        }
    }
}
