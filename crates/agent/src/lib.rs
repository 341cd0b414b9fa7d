//! Chat coordination
//!
//! Features:
//! - Bounded per-conversation context windows with idle expiry and LRU capping
//! - Block-structured responses with a fixed ungrounded fallback
//! - Non-streaming and streaming chat turns over the retrieval pipeline
//! - Cancellation on client disconnect and an overall request deadline

pub mod context_window;
pub mod coordinator;
pub mod response;

pub use context_window::ContextWindowStore;
pub use coordinator::ChatCoordinator;
pub use response::{error_envelope, fallback_response, parse_blocks, FALLBACK_TEXT};
