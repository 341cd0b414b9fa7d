//! Grounding gate
//!
//! Decides whether retrieved context may back an answer and assembles the
//! context text and source list from the matches that clear the threshold.

use neo_core::{HybridResult, MatchMetadata, Mode, RetrievalMatch, SourceRecord};

/// Joins context chunks in prompts
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// A match the gate can score
pub trait Scored {
    fn gate_score(&self) -> f32;
    fn metadata(&self) -> &MatchMetadata;
}

impl Scored for RetrievalMatch {
    fn gate_score(&self) -> f32 {
        self.vector_score
    }

    fn metadata(&self) -> &MatchMetadata {
        &self.metadata
    }
}

impl Scored for HybridResult {
    fn gate_score(&self) -> f32 {
        self.final_score
    }

    fn metadata(&self) -> &MatchMetadata {
        &self.metadata
    }
}

/// Context text and the sources it was built from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundedContext {
    pub text: String,
    pub sources: Vec<SourceRecord>,
}

impl GroundedContext {
    /// Whitespace-only context cannot ground an answer
    pub fn is_sufficient(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Highest gate score, `None` when there are no matches
pub fn best_score<T: Scored>(matches: &[T]) -> Option<f32> {
    matches
        .iter()
        .map(Scored::gate_score)
        .fold(None, |best, s| Some(best.map_or(s, |b: f32| b.max(s))))
}

/// General never uses retrieval; rag modes need a best score at or above threshold
pub fn should_use_rag(mode: Mode, best_score: Option<f32>, threshold: f32) -> bool {
    match mode {
        Mode::General => false,
        Mode::RagStrong | Mode::RagWeak => best_score.is_some_and(|s| s >= threshold),
    }
}

/// Join the text of matches scoring at least `threshold`, in input order
pub fn extract_context<T: Scored>(matches: &[T], threshold: f32) -> GroundedContext {
    let mut parts = Vec::new();
    let mut sources = Vec::new();

    for m in matches.iter().filter(|m| m.gate_score() >= threshold) {
        let metadata = m.metadata();
        match metadata.text.as_deref() {
            Some(text) if !text.is_empty() => {
                parts.push(text);
                sources.push(SourceRecord::from_metadata(metadata, m.gate_score()));
            }
            _ => {}
        }
    }

    GroundedContext {
        text: parts.join(CONTEXT_SEPARATOR),
        sources,
    }
}

/// Gate bound to a configured threshold
#[derive(Debug, Clone, Copy)]
pub struct GroundingGate {
    threshold: f32,
}

impl GroundingGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn should_use_rag(&self, mode: Mode, best_score: Option<f32>) -> bool {
        should_use_rag(mode, best_score, self.threshold)
    }

    pub fn extract_context<T: Scored>(&self, matches: &[T]) -> GroundedContext {
        extract_context(matches, self.threshold)
    }

    /// Gate decision and context in one step; `None` means answer with the fallback
    pub fn ground<T: Scored>(&self, mode: Mode, matches: &[T]) -> Option<GroundedContext> {
        let best = best_score(matches);
        if !self.should_use_rag(mode, best) {
            tracing::debug!(mode = %mode, best_score = ?best, threshold = self.threshold, "Grounding rejected");
            return None;
        }

        let context = self.extract_context(matches);
        if !context.is_sufficient() {
            tracing::debug!(mode = %mode, "Empty context after filtering");
            return None;
        }

        Some(context)
    }
}
