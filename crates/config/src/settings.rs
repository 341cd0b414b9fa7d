//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{context_window, endpoints, llm, rag, timeouts};
use crate::{ConfigError, VocabularyConfig};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub vocabulary: VocabularyConfig,

    #[serde(default)]
    pub context_window: ContextWindowConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Deadline for one chat request, retrieval plus generation
    #[serde(default = "default_request_deadline_ms")]
    pub request_deadline_ms: u64,
}

fn default_request_deadline_ms() -> u64 {
    timeouts::REQUEST_DEADLINE_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::default(),
            llm: LlmSettings::default(),
            rag: RagConfig::default(),
            vocabulary: VocabularyConfig::default(),
            context_window: ContextWindowConfig::default(),
            knowledge: KnowledgeConfig::default(),
            observability: ObservabilityConfig::default(),
            request_deadline_ms: default_request_deadline_ms(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_llm()?;
        self.validate_rag()?;
        self.validate_context_window()?;
        self.vocabulary.validate()?;

        if self.request_deadline_ms < timeouts::MIN_REQUEST_DEADLINE_MS {
            return Err(ConfigError::invalid(
                "request_deadline_ms",
                format!(
                    "Must be at least {}ms, got {}",
                    timeouts::MIN_REQUEST_DEADLINE_MS,
                    self.request_deadline_ms
                ),
            ));
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;

        if llm.endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("llm.endpoint", "Must not be empty"));
        }

        if llm.model.trim().is_empty() {
            return Err(ConfigError::invalid("llm.model", "Must not be empty"));
        }

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::invalid(
                "llm.temperature",
                format!("Must be between 0.0 and 2.0, got {}", llm.temperature),
            ));
        }

        if llm.max_tokens == 0 {
            return Err(ConfigError::invalid("llm.max_tokens", "Must be at least 1"));
        }

        if self.environment.is_production() && llm.resolved_api_key().is_none() {
            return Err(ConfigError::invalid(
                "llm.api_key",
                format!("Required in production (or set {})", endpoints::API_KEY_ENV),
            ));
        }

        Ok(())
    }

    fn validate_rag(&self) -> Result<(), ConfigError> {
        let rag = &self.rag;

        for (field, value) in [
            ("rag.similarity_threshold", rag.similarity_threshold),
            ("rag.visibility_threshold", rag.visibility_threshold),
            ("rag.vector_weight", rag.vector_weight),
            ("rag.keyword_weight", rag.keyword_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(
                    field,
                    format!("Must be between 0.0 and 1.0, got {}", value),
                ));
            }
        }

        let weight_sum = rag.vector_weight + rag.keyword_weight;
        if (weight_sum - 1.0).abs() > 1e-3 {
            return Err(ConfigError::invalid(
                "rag.vector_weight",
                format!(
                    "vector_weight + keyword_weight must equal 1.0, got {}",
                    weight_sum
                ),
            ));
        }

        if rag.initial_top_k == 0 {
            return Err(ConfigError::invalid("rag.initial_top_k", "Must be at least 1"));
        }

        if rag.hop_top_k == 0 {
            return Err(ConfigError::invalid("rag.hop_top_k", "Must be at least 1"));
        }

        Ok(())
    }

    fn validate_context_window(&self) -> Result<(), ConfigError> {
        let window = &self.context_window;

        if window.max_messages < 2 {
            return Err(ConfigError::invalid(
                "context_window.max_messages",
                format!("Must hold at least one exchange (2), got {}", window.max_messages),
            ));
        }

        if window.max_messages > context_window::MAX_MESSAGES {
            return Err(ConfigError::invalid(
                "context_window.max_messages",
                format!(
                    "Must not exceed {}, got {}",
                    context_window::MAX_MESSAGES,
                    window.max_messages
                ),
            ));
        }

        if window.max_conversations == 0 {
            return Err(ConfigError::invalid(
                "context_window.max_conversations",
                "Must be at least 1",
            ));
        }

        Ok(())
    }
}

/// Language-model backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// API key; falls back to `OPENROUTER_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries for transient failures on single-shot calls
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,

    #[serde(default = "default_llm_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_llm_endpoint() -> String {
    endpoints::OPENROUTER_DEFAULT.to_string()
}
fn default_llm_model() -> String {
    endpoints::DEFAULT_MODEL.to_string()
}
fn default_temperature() -> f32 {
    llm::TEMPERATURE
}
fn default_max_tokens() -> usize {
    llm::MAX_TOKENS
}
fn default_llm_timeout_ms() -> u64 {
    timeouts::LLM_REQUEST_MS
}
fn default_llm_retries() -> u32 {
    llm::MAX_RETRIES
}
fn default_llm_backoff_ms() -> u64 {
    llm::INITIAL_BACKOFF_MS
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: None,
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_llm_timeout_ms(),
            max_retries: default_llm_retries(),
            initial_backoff_ms: default_llm_backoff_ms(),
        }
    }
}

impl LlmSettings {
    /// Configured key, else the `OPENROUTER_API_KEY` environment variable
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(endpoints::API_KEY_ENV)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Minimum score for context to ground an answer
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Threshold used when showing accumulated evidence to the judge
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,

    /// Follow-up retrieval rounds; 0 disables multi-hop
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    #[serde(default = "default_initial_top_k")]
    pub initial_top_k: usize,

    #[serde(default = "default_hop_top_k")]
    pub hop_top_k: usize,

    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,

    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Vector search retries after the first failure
    #[serde(default = "default_search_retries")]
    pub search_retries: u32,

    #[serde(default = "default_search_backoff_ms")]
    pub search_backoff_ms: u64,
}

fn default_similarity_threshold() -> f32 {
    rag::SIMILARITY_THRESHOLD
}
fn default_visibility_threshold() -> f32 {
    rag::VISIBILITY_THRESHOLD
}
fn default_max_hops() -> usize {
    rag::MAX_HOPS
}
fn default_initial_top_k() -> usize {
    rag::INITIAL_TOP_K
}
fn default_hop_top_k() -> usize {
    rag::HOP_TOP_K
}
fn default_vector_weight() -> f32 {
    rag::VECTOR_WEIGHT
}
fn default_keyword_weight() -> f32 {
    rag::KEYWORD_WEIGHT
}
fn default_search_retries() -> u32 {
    rag::SEARCH_RETRIES
}
fn default_search_backoff_ms() -> u64 {
    rag::SEARCH_BACKOFF_MS
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            visibility_threshold: default_visibility_threshold(),
            max_hops: default_max_hops(),
            initial_top_k: default_initial_top_k(),
            hop_top_k: default_hop_top_k(),
            vector_weight: default_vector_weight(),
            keyword_weight: default_keyword_weight(),
            search_retries: default_search_retries(),
            search_backoff_ms: default_search_backoff_ms(),
        }
    }
}

impl RagConfig {
    pub fn multi_hop_enabled(&self) -> bool {
        self.max_hops > 0
    }
}

/// Per-conversation history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextWindowConfig {
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Conversations untouched for this long read as empty
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,

    /// Least-recently-used conversations are evicted past this count
    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,
}

fn default_max_messages() -> usize {
    context_window::MAX_MESSAGES
}
fn default_idle_ttl_secs() -> u64 {
    context_window::IDLE_TTL_SECS
}
fn default_max_conversations() -> usize {
    context_window::MAX_CONVERSATIONS
}

impl Default for ContextWindowConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            idle_ttl_secs: default_idle_ttl_secs(),
            max_conversations: default_max_conversations(),
        }
    }
}

/// Local knowledge corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory of YAML/JSON knowledge files
    #[serde(default = "default_knowledge_dir")]
    pub dir: PathBuf,

    /// Dimension of the hashed embedding used by the in-memory index
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

fn default_knowledge_dir() -> PathBuf {
    PathBuf::from("knowledge")
}
fn default_embedding_dim() -> usize {
    384
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dir: default_knowledge_dir(),
            embedding_dim: default_embedding_dim(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    /// Serve Prometheus metrics
    #[serde(default)]
    pub metrics_enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: false,
            metrics_port: default_metrics_port(),
        }
    }
}

/// Load settings from files and environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("NEO")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
