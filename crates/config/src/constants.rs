//! Centralized defaults
//!
//! Single source of truth for the tuning values used across the workspace.
//! `Settings` defaults read from here.

/// Upstream endpoints
pub mod endpoints {
    /// OpenRouter (OpenAI-compatible) API base
    pub const OPENROUTER_DEFAULT: &str = "https://openrouter.ai/api/v1";

    /// Default chat model
    pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";

    /// Environment variable consulted when no API key is configured
    pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
}

/// Timeouts (in milliseconds)
pub mod timeouts {
    /// Single language-model HTTP request
    pub const LLM_REQUEST_MS: u64 = 30_000;

    /// Whole chat request: retrieval plus generation
    pub const REQUEST_DEADLINE_MS: u64 = 60_000;

    /// Lower bound accepted for the request deadline
    pub const MIN_REQUEST_DEADLINE_MS: u64 = 1_000;
}

/// Retrieval defaults
pub mod rag {
    /// Minimum score for retrieved context to ground an answer
    pub const SIMILARITY_THRESHOLD: f32 = 0.5;

    /// Looser threshold used only to show borderline evidence to the judge
    pub const VISIBILITY_THRESHOLD: f32 = 0.4;

    /// Extra retrieval rounds after the initial search
    pub const MAX_HOPS: usize = 1;

    /// Candidates for the initial search
    pub const INITIAL_TOP_K: usize = 10;

    /// Candidates per generated sub-query
    pub const HOP_TOP_K: usize = 5;

    /// Weight of the vector similarity in the hybrid score
    pub const VECTOR_WEIGHT: f32 = 0.7;

    /// Weight of the keyword overlap in the hybrid score
    pub const KEYWORD_WEIGHT: f32 = 0.3;

    /// Vector search retries after the first failure
    pub const SEARCH_RETRIES: u32 = 1;

    /// Initial retry backoff (doubles each retry)
    pub const SEARCH_BACKOFF_MS: u64 = 100;

    /// Upper bound on the domain-term boost inside the keyword score
    pub const MAX_DOMAIN_BOOST: f32 = 0.2;

    /// Boost factor applied to the domain-term match ratio
    pub const DOMAIN_BOOST_FACTOR: f32 = 0.3;
}

/// Conversation context window
pub mod context_window {
    /// Messages kept per conversation
    pub const MAX_MESSAGES: usize = 8;

    /// Idle conversations are forgotten after this many seconds
    pub const IDLE_TTL_SECS: u64 = 3_600;

    /// Hard cap on tracked conversations
    pub const MAX_CONVERSATIONS: usize = 10_000;
}

/// Language-model sampling
pub mod llm {
    pub const TEMPERATURE: f32 = 0.7;
    pub const MAX_TOKENS: usize = 1024;
    pub const MAX_RETRIES: u32 = 2;
    pub const INITIAL_BACKOFF_MS: u64 = 200;
}
