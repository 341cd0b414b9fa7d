//! Collaborator traits
//!
//! ```text
//! Retrieval:
//!   - VectorSearch: query text -> scored matches with metadata
//!
//! Language Models:
//!   - LanguageModel: single-shot and streamed completion
//! ```

mod llm;
mod search;

pub use llm::{LanguageModel, TextStream};
pub use search::VectorSearch;
