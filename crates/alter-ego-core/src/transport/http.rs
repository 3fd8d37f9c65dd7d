use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{ChatRequest, ChatResponse, Reply, Transport};
use crate::error::{TransportFault, SERVER_ERROR_MESSAGE};

pub const CHAT_PATH: &str = "/api/chat";

/// Upper bound on waiting for a reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// JSON-over-HTTP client for the chat backend
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), CHAT_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, message: &str) -> Result<Reply, TransportFault> {
        let request = ChatRequest {
            message: message.to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            // An unreadable body still counts as a server answer
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|body| body.message)
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| SERVER_ERROR_MESSAGE.to_string());

            tracing::warn!(status = status.as_u16(), "chat backend returned an error status");
            return Err(TransportFault::Server {
                status_code: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await.map_err(classify)?;
        Ok(body.into())
    }
}

/// Sort a client error into "no response" versus everything else.
fn classify(err: reqwest::Error) -> TransportFault {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        tracing::warn!(error = %err, "chat backend unreachable");
        TransportFault::unreachable()
    } else {
        tracing::warn!(error = %err, "chat request failed");
        TransportFault::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let transport = HttpTransport::new("http://localhost:8000", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(transport.endpoint(), "http://localhost:8000/api/chat");

        let transport = HttpTransport::new("https://example.com/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(transport.endpoint(), "https://example.com/api/chat");
    }
}
