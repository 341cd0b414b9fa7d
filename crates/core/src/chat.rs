//! Chat boundary types
//!
//! Request/response shapes for the non-streaming path and the event
//! protocol for the streaming path (`meta`, `chunk*`, then `done` or
//! `error`).

use serde::{Deserialize, Serialize};

use crate::retrieval::SourceRecord;

/// Length of the short request identifier
const REQUEST_ID_LEN: usize = 8;

/// Generate a short request id (first 8 hex chars of a v4 UUID)
pub fn new_request_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(REQUEST_ID_LEN);
    id
}

/// Incoming chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// Response mode reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    General,
    Rag,
}

/// Structured content block kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Heading,
    Paragraph,
    List,
    NumberedList,
    Quote,
    Code,
    Divider,
}

/// A single rendered content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// For list and numbered_list blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
    /// For code blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Block {
    pub fn paragraph(content: impl Into<String>) -> Self {
        Self {
            block_type: BlockType::Paragraph,
            content: Some(content.into()),
            items: None,
            language: None,
        }
    }
}

/// Non-streaming chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    pub mode: ResponseMode,
    pub request_id: String,
}

/// Error body returned when a request fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub request_id: String,
}

/// Streaming protocol event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatEvent {
    Meta {
        mode: ResponseMode,
        sources: Vec<SourceRecord>,
        request_id: String,
    },
    Chunk {
        data: String,
    },
    Done,
    Error {
        message: String,
    },
}

impl ChatEvent {
    /// `done` and `error` end the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Done | ChatEvent::Error { .. })
    }
}
