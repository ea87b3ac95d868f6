//! Hosted chat-completion inference behind a narrow async seam.

mod http;
mod reply;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpInferenceClient;
pub use reply::extract_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// One completion call; `json_reply` asks the provider for a JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_reply: bool,
}

impl CompletionRequest {
    pub fn json(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: vec![ChatMessage {
                role: ChatRole::User,
                content: prompt.into(),
            }],
            temperature: 0.2,
            max_tokens: 800,
            json_reply: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("inference is disabled")]
    Disabled,
    #[error("inference timed out after {0:?}")]
    Timeout(Duration),
    #[error("inference transport failed: {0}")]
    Transport(String),
    #[error("inference provider answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("inference reply carried no content")]
    EmptyReply,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError>;
}

/// Client used when no API key is configured; every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledInference;

#[async_trait]
impl InferenceClient for DisabledInference {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, InferenceError> {
        Err(InferenceError::Disabled)
    }
}

/// Run one completion, giving up once `limit` elapses.
pub async fn complete_within(
    client: &dyn InferenceClient,
    request: CompletionRequest,
    limit: Duration,
) -> Result<String, InferenceError> {
    match tokio::time::timeout(limit, client.complete(request)).await {
        Ok(result) => result,
        Err(_) => Err(InferenceError::Timeout(limit)),
    }
}
