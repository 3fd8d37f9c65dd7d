//! Boundary to the chat backend: send a message, get a reply or a typed fault.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransportFault;

pub use http::HttpTransport;

/// Request body posted to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Success body returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    /// ISO-8601 on the wire
    pub timestamp: DateTime<Utc>,
}

/// A successful settlement of one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub reply: String,
    /// Server-provided time of the reply
    pub timestamp: DateTime<Utc>,
}

impl From<ChatResponse> for Reply {
    fn from(response: ChatResponse) -> Self {
        Self {
            reply: response.response,
            timestamp: response.timestamp,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: &str) -> Result<Reply, TransportFault>;
}
