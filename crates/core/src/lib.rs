//! Core traits and types for the Neo grounded-chat engine
//!
//! This crate provides foundational types used across all other crates:
//! - Collaborator traits (vector search, language model)
//! - Conversation message types
//! - Retrieval match and scoring types
//! - Chat boundary types (blocks, sources, streaming events)
//! - Error types

pub mod chat;
pub mod conversation;
pub mod error;
pub mod llm_types;
pub mod retrieval;
pub mod traits;

pub use chat::{
    new_request_id, Block, BlockType, ChatEvent, ChatRequest, ChatResponse, ErrorEnvelope,
    ResponseMode,
};
pub use conversation::{Message, Role};
pub use error::{Error, Result};
pub use llm_types::CompletionRequest;
pub use retrieval::{HybridResult, MatchMetadata, Mode, RetrievalMatch, SourceRecord};

pub use traits::{LanguageModel, TextStream, VectorSearch};
