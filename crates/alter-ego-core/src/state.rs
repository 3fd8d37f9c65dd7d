//! UI-agnostic conversation state
//!
//! The message log and the status of the newest exchange. Nothing here is
//! persisted; a `Conversation` lives as long as the chat session that owns it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub content: String,
    pub role: ChatRole,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(ChatRole::User, content.into(), timestamp)
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(ChatRole::Assistant, content.into(), timestamp)
    }

    fn new(role: ChatRole, content: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            role,
            timestamp,
        }
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Append-only message log plus the pending/error status of the newest exchange.
///
/// Only the chat session mutates it; everyone else gets read access.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    pending: bool,
    last_error: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in insertion (chronological) order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn pending(&self) -> bool {
        self.pending
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Optimistic append of the outgoing message; the exchange is now in flight.
    pub(crate) fn begin_exchange(&mut self, outgoing: ChatMessage) {
        self.last_error = None;
        self.messages.push(outgoing);
        self.pending = true;
    }

    pub(crate) fn deliver(&mut self, reply: ChatMessage) {
        self.messages.push(reply);
        self.pending = false;
    }

    /// The outgoing message stays in the log.
    pub(crate) fn fail(&mut self, error: String) {
        self.last_error = Some(error);
        self.pending = false;
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }
}
