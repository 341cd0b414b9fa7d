//! Response shaping
//!
//! Turns raw model output into content blocks and builds the fixed fallback
//! and error bodies.

use serde::Deserialize;

use neo_core::{Block, BlockType, ChatResponse, ErrorEnvelope, ResponseMode};
use neo_llm::parse_json_output;

/// Reply used when a knowledge question cannot be grounded
pub const FALLBACK_TEXT: &str = "I don't have that information in Cogneoverse knowledge. \
Try asking about general topics, or rephrase your question about our internal projects.";

#[derive(Debug, Deserialize)]
struct BlockEnvelope {
    #[serde(default)]
    blocks: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    #[serde(rename = "type", default)]
    block_type: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    items: Option<Vec<String>>,
    #[serde(default)]
    language: Option<String>,
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        let block_type = raw
            .block_type
            .and_then(|t| serde_json::from_value(serde_json::Value::String(t)).ok())
            .unwrap_or(BlockType::Paragraph);

        Block {
            block_type,
            content: raw.content,
            items: raw.items,
            language: raw.language,
        }
    }
}

/// Parse `{"blocks": [...]}` model output, fenced or bare
///
/// Anything that is not a block document becomes one paragraph holding the
/// raw text. Blocks without a recognised type are paragraphs.
pub fn parse_blocks(raw: &str) -> Vec<Block> {
    match parse_json_output::<BlockEnvelope>(raw) {
        Ok(envelope) => envelope.blocks.into_iter().map(Block::from).collect(),
        Err(e) => {
            tracing::debug!(error = %e, "Model output is not a block document");
            vec![Block::paragraph(raw.trim())]
        }
    }
}

/// Fixed reply for an ungrounded knowledge question
pub fn fallback_response(request_id: impl Into<String>) -> ChatResponse {
    ChatResponse {
        blocks: vec![Block::paragraph(FALLBACK_TEXT)],
        sources: Vec::new(),
        mode: ResponseMode::Rag,
        request_id: request_id.into(),
    }
}

pub fn error_envelope(error: impl ToString, request_id: impl Into<String>) -> ErrorEnvelope {
    ErrorEnvelope {
        error: error.to_string(),
        request_id: request_id.into(),
    }
}
