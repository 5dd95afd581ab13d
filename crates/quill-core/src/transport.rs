use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::document::Document;
use crate::error::TransportError;
use crate::session::SessionId;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: SessionId,
    pub user_input: String,
}

/// Success body of `POST /chat`. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Kept raw so a bad tree only affects the document view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
}

impl ChatResponse {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            document: None,
        }
    }

    pub fn with_document(document: &Document) -> Self {
        Self {
            response: None,
            document: serde_json::to_value(document).ok(),
        }
    }

    /// Parse the `document` field, if present.
    pub fn parse_document(&self) -> Option<Result<Document, serde_json::Error>> {
        self.document
            .as_ref()
            .filter(|value| !value.is_null())
            .map(|value| Document::deserialize(value))
    }
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

/// The single network transport used by both views
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        (**self).send(request).await
    }
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe `GET /health`. Only used for a startup diagnostic.
    pub async fn health(&self) -> Result<bool, TransportError> {
        let url = format!("{}/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let health: HealthResponse = response.json().await?;
        Ok(health.status == "ok")
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let url = format!("{}/chat", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "Received chat response");
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}
