//! Chat coordinator
//!
//! Runs one chat turn end to end: classify the message, retrieve and gate
//! context for knowledge questions, call the language model, and record the
//! completed exchange in the conversation window.
//!
//! The streaming path runs each request on its own task feeding a bounded
//! channel. Dropping the receiving half cancels the task at its next await;
//! nothing is appended for a cancelled, failed or ungrounded turn.

use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use neo_config::Settings;
use neo_core::{
    new_request_id, ChatEvent, ChatRequest, ChatResponse, CompletionRequest, Error,
    ErrorEnvelope, HybridResult, LanguageModel, Mode, ResponseMode, Result, SourceRecord,
    VectorSearch,
};
use neo_llm::templates;
use neo_rag::{
    GroundedContext, GroundingGate, HybridScorer, KeywordExtractor, ModeClassifier,
    MultiHopConfig, MultiHopOrchestrator,
};

use crate::context_window::ContextWindowStore;
use crate::response::{error_envelope, fallback_response, parse_blocks, FALLBACK_TEXT};

/// Events buffered between the request task and the consumer
pub const EVENT_BUFFER: usize = 32;

/// Outcome of the retrieval decision
enum Grounding {
    General,
    Grounded(GroundedContext),
    Ungrounded,
}

impl Grounding {
    fn response_mode(&self) -> ResponseMode {
        match self {
            Grounding::General => ResponseMode::General,
            Grounding::Grounded(_) | Grounding::Ungrounded => ResponseMode::Rag,
        }
    }

    fn response_mode_label(&self) -> &'static str {
        match self.response_mode() {
            ResponseMode::General => "general",
            ResponseMode::Rag => "rag",
        }
    }
}

/// How a streamed turn ended
enum StreamEnd {
    Completed,
    Fallback,
    Failed(String),
    Cancelled,
}

pub struct ChatCoordinator {
    classifier: ModeClassifier,
    scorer: Arc<HybridScorer>,
    multihop: Option<MultiHopOrchestrator>,
    gate: GroundingGate,
    llm: Arc<dyn LanguageModel>,
    context: Arc<ContextWindowStore>,
    initial_top_k: usize,
    deadline: Duration,
}

impl ChatCoordinator {
    /// Wire the pipeline from settings; the model also serves as the multi-hop judge
    pub fn new(
        settings: &Settings,
        search: Arc<dyn VectorSearch>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        let extractor = Arc::new(KeywordExtractor::new(&settings.vocabulary));
        let scorer = Arc::new(HybridScorer::new(search, extractor, &settings.rag));

        let multihop = settings.rag.multi_hop_enabled().then(|| {
            MultiHopOrchestrator::new(
                Arc::clone(&scorer),
                Arc::clone(&llm),
                MultiHopConfig::from(&settings.rag),
            )
        });

        Self {
            classifier: ModeClassifier::new(&settings.vocabulary),
            scorer,
            multihop,
            gate: GroundingGate::new(settings.rag.similarity_threshold),
            llm,
            context: Arc::new(ContextWindowStore::new(&settings.context_window)),
            initial_top_k: settings.rag.initial_top_k,
            deadline: Duration::from_millis(settings.request_deadline_ms),
        }
    }

    /// Share an existing context store
    pub fn with_context_store(mut self, context: Arc<ContextWindowStore>) -> Self {
        self.context = context;
        self
    }

    pub fn context_store(&self) -> &Arc<ContextWindowStore> {
        &self.context
    }

    /// Answer a message with structured blocks
    pub async fn respond(
        &self,
        request: ChatRequest,
    ) -> std::result::Result<ChatResponse, ErrorEnvelope> {
        let request_id = new_request_id();
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.deadline, self.respond_inner(&request_id, request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.deadline.as_millis() as u64)),
        };

        metrics::histogram!("neo_request_duration_seconds").record(started.elapsed().as_secs_f64());

        outcome.map_err(|e| {
            tracing::error!(request_id = %request_id, error = %e, "Chat request failed");
            error_envelope(e, request_id)
        })
    }

    async fn respond_inner(&self, request_id: &str, request: ChatRequest) -> Result<ChatResponse> {
        let message = validate_message(&request)?;
        let conversation_id = conversation_id(&request, request_id);

        let mode = self.classifier.classify(message);
        tracing::info!(request_id = %request_id, mode = %mode, "Handling chat request");

        let grounding = self.ground(request_id, mode, message).await?;
        metrics::counter!("neo_requests_total", "mode" => grounding.response_mode_label())
            .increment(1);

        let response_mode = grounding.response_mode();
        let (system_prompt, sources) = match grounding {
            Grounding::General => (templates::general(), Vec::new()),
            Grounding::Grounded(context) => (templates::grounded(&context.text), context.sources),
            Grounding::Ungrounded => {
                metrics::counter!("neo_fallback_total").increment(1);
                return Ok(fallback_response(request_id));
            }
        };

        let history = self.context.get(&conversation_id);
        let completion = CompletionRequest::new(system_prompt, message).with_history(history);
        let raw = self.llm.complete(&completion).await.map_err(|e| {
            metrics::counter!("neo_llm_errors_total").increment(1);
            e
        })?;

        self.context.append_exchange(&conversation_id, message, raw.as_str());

        Ok(ChatResponse {
            blocks: parse_blocks(&raw),
            sources,
            mode: response_mode,
            request_id: request_id.to_string(),
        })
    }

    /// Answer a message as a stream of events
    ///
    /// The stream yields one `meta`, any number of `chunk`s and exactly one
    /// terminal `done` or `error`.
    pub fn stream(self: &Arc<Self>, request: ChatRequest) -> ReceiverStream<ChatEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let coordinator = Arc::clone(self);

        tokio::spawn(async move {
            coordinator.drive_stream(request, tx).await;
        });

        ReceiverStream::new(rx)
    }

    async fn drive_stream(&self, request: ChatRequest, tx: mpsc::Sender<ChatEvent>) {
        let request_id = new_request_id();
        let started = Instant::now();

        let end = tokio::select! {
            _ = tx.closed() => StreamEnd::Cancelled,
            result = tokio::time::timeout(self.deadline, self.stream_turn(&request_id, request, &tx)) => {
                match result {
                    Ok(end) => end,
                    Err(_) => StreamEnd::Failed(Error::Timeout(self.deadline.as_millis() as u64).to_string()),
                }
            }
        };

        metrics::histogram!("neo_request_duration_seconds").record(started.elapsed().as_secs_f64());

        match end {
            StreamEnd::Completed => {
                tracing::info!(request_id = %request_id, elapsed_ms = started.elapsed().as_millis() as u64, "Stream complete");
            }
            StreamEnd::Fallback => {
                tracing::info!(request_id = %request_id, "Stream answered with fallback");
            }
            StreamEnd::Failed(message) => {
                tracing::error!(request_id = %request_id, error = %message, "Stream failed");
                let _ = tx.send(ChatEvent::Error { message }).await;
            }
            StreamEnd::Cancelled => {
                metrics::counter!("neo_stream_cancelled_total").increment(1);
                tracing::info!(request_id = %request_id, "Stream cancelled by client");
            }
        }
    }

    async fn stream_turn(
        &self,
        request_id: &str,
        request: ChatRequest,
        tx: &mpsc::Sender<ChatEvent>,
    ) -> StreamEnd {
        let message = match validate_message(&request) {
            Ok(message) => message,
            Err(e) => return StreamEnd::Failed(e.to_string()),
        };
        let conversation_id = conversation_id(&request, request_id);

        let mode = self.classifier.classify(message);
        tracing::info!(request_id = %request_id, mode = %mode, "Handling streaming chat request");

        let grounding = match self.ground(request_id, mode, message).await {
            Ok(grounding) => grounding,
            Err(e) => return StreamEnd::Failed(e.to_string()),
        };
        metrics::counter!("neo_requests_total", "mode" => grounding.response_mode_label())
            .increment(1);

        let response_mode = grounding.response_mode();
        let (system_prompt, sources) = match grounding {
            Grounding::General => (templates::general_streaming(), Vec::new()),
            Grounding::Grounded(context) => (
                templates::grounded_streaming(&context.text),
                context.sources,
            ),
            Grounding::Ungrounded => {
                metrics::counter!("neo_fallback_total").increment(1);
                return self.stream_fallback(request_id, tx).await;
            }
        };

        if !send(tx, meta(response_mode, sources, request_id)).await {
            return StreamEnd::Cancelled;
        }

        let history = self.context.get(&conversation_id);
        let completion = CompletionRequest::new(system_prompt, message).with_history(history);

        let mut upstream = self.llm.complete_stream(completion);
        let mut full = String::new();
        while let Some(item) = upstream.next().await {
            match item {
                Ok(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    full.push_str(&text);
                    if !send(tx, ChatEvent::Chunk { data: text }).await {
                        return StreamEnd::Cancelled;
                    }
                }
                Err(e) => {
                    metrics::counter!("neo_llm_errors_total").increment(1);
                    return StreamEnd::Failed(e.to_string());
                }
            }
        }
        drop(upstream);

        // Append and `done` must not be separated by an await
        let Ok(permit) = tx.reserve().await else {
            return StreamEnd::Cancelled;
        };
        self.context.append_exchange(&conversation_id, message, full);
        permit.send(ChatEvent::Done);
        StreamEnd::Completed
    }

    async fn stream_fallback(&self, request_id: &str, tx: &mpsc::Sender<ChatEvent>) -> StreamEnd {
        let events = [
            meta(ResponseMode::Rag, Vec::new(), request_id),
            ChatEvent::Chunk {
                data: FALLBACK_TEXT.to_string(),
            },
            ChatEvent::Done,
        ];
        for event in events {
            if !send(tx, event).await {
                return StreamEnd::Cancelled;
            }
        }
        StreamEnd::Fallback
    }

    /// Classification-driven retrieval and gating
    async fn ground(&self, request_id: &str, mode: Mode, message: &str) -> Result<Grounding> {
        if !mode.wants_retrieval() {
            return Ok(Grounding::General);
        }

        let results = self.retrieve(message).await?;
        tracing::debug!(request_id = %request_id, results = results.len(), "Retrieval complete");

        Ok(match self.gate.ground(mode, &results) {
            Some(context) => Grounding::Grounded(context),
            None => Grounding::Ungrounded,
        })
    }

    async fn retrieve(&self, message: &str) -> Result<Vec<HybridResult>> {
        match &self.multihop {
            Some(orchestrator) => Ok(orchestrator.run(message).await?.results),
            None => Ok(self.scorer.search(message, self.initial_top_k).await?),
        }
    }
}

fn validate_message(request: &ChatRequest) -> Result<&str> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(Error::InvalidRequest("message must not be empty".to_string()));
    }
    Ok(message)
}

/// Requests without a conversation id get a conversation of their own
fn conversation_id(request: &ChatRequest, request_id: &str) -> String {
    request
        .conversation_id
        .clone()
        .unwrap_or_else(|| request_id.to_string())
}

fn meta(mode: ResponseMode, sources: Vec<SourceRecord>, request_id: &str) -> ChatEvent {
    ChatEvent::Meta {
        mode,
        sources,
        request_id: request_id.to_string(),
    }
}

/// `false` once the consumer has gone away
async fn send(tx: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> bool {
    tx.send(event).await.is_ok()
}
