//! Prompt building
//!
//! Turns a `CompletionRequest` into the ordered chat message list sent to
//! the backend: system prompt, prior turns, then the new user message.

use serde::{Deserialize, Serialize};
use std::fmt;

use neo_core::{CompletionRequest, Message};

/// Message role on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<neo_core::Role> for Role {
    fn from(role: neo_core::Role) -> Self {
        match role {
            neo_core::Role::User => Role::User,
            neo_core::Role::Assistant => Role::Assistant,
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.into(),
            content: msg.content.clone(),
        }
    }
}

/// Prompt builder
#[derive(Debug, Default)]
pub struct PromptBuilder {
    messages: Vec<ChatMessage>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the full message list for a completion request
    pub fn from_request(request: &CompletionRequest) -> Vec<ChatMessage> {
        Self::new()
            .system_prompt(&request.system_prompt)
            .with_history(&request.history)
            .user_message(&request.user_message)
            .build()
    }

    pub fn system_prompt(mut self, prompt: &str) -> Self {
        if !prompt.is_empty() {
            self.messages.push(ChatMessage::system(prompt));
        }
        self
    }

    /// Add conversation history (continuity only)
    pub fn with_history(mut self, history: &[Message]) -> Self {
        self.messages.extend(history.iter().map(ChatMessage::from));
        self
    }

    pub fn user_message(mut self, message: &str) -> Self {
        self.messages.push(ChatMessage::user(message));
        self
    }

    pub fn build(self) -> Vec<ChatMessage> {
        self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}
