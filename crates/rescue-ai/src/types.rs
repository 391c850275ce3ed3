use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::extract_advice;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// One chat message in the advisory request body.
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Body posted to the advisory endpoint: `{ "messages": [...] }`.
pub struct AdvisoryRequest {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq)]
/// Raw JSON body returned by a successful advisory call.
pub struct AdvisoryReply {
    pub body: Value,
}

impl AdvisoryReply {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    pub fn advice_text(&self) -> Option<String> {
        extract_advice(&self.body)
    }
}

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("advisory service not configured: {0}")]
    Configuration(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("advisory endpoint returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("advisory request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl AdvisoryError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[async_trait]
/// Transport seam for the advisory service.
pub trait AdvisoryClient: Send + Sync {
    async fn request_advice(
        &self,
        request: AdvisoryRequest,
    ) -> Result<AdvisoryReply, AdvisoryError>;
}

#[derive(Debug, Clone)]
/// Stand-in used when credentials or endpoints are missing at startup; every
/// request fails with [`AdvisoryError::Configuration`].
pub struct UnconfiguredAdvisoryClient {
    reason: String,
}

impl UnconfiguredAdvisoryClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl AdvisoryClient for UnconfiguredAdvisoryClient {
    async fn request_advice(
        &self,
        _request: AdvisoryRequest,
    ) -> Result<AdvisoryReply, AdvisoryError> {
        Err(AdvisoryError::Configuration(self.reason.clone()))
    }
}
