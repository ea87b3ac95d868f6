use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ChatRole, CompletionRequest, InferenceClient, InferenceError};
use crate::config::InferenceConfig;

/// Chat-completions client for OpenAI-compatible providers.
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpInferenceClient {
    pub fn new(config: &InferenceConfig, api_key: String) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout + Duration::from_secs(1))
            .build()
            .map_err(|err| InferenceError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut messages = vec![WireMessage {
            role: "system",
            content: &request.system,
        }];
        messages.extend(request.messages.iter().map(|message| WireMessage {
            role: match message.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            },
            content: &message.content,
        }));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json_reply {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, InferenceError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.body(&request))
            .send()
            .await
            .map_err(|err| InferenceError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let reply: CompletionReply = response
            .json()
            .await
            .map_err(|err| InferenceError::Transport(err.to_string()))?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(InferenceError::EmptyReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ChatMessage;

    fn config() -> InferenceConfig {
        InferenceConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "https://inference.example/v1/".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(8),
        }
    }

    #[test]
    fn endpoint_joins_base_url_without_double_slash() {
        let client = HttpInferenceClient::new(&config(), "sk-test".to_string()).expect("builds");
        assert_eq!(client.endpoint(), "https://inference.example/v1/chat/completions");
    }

    #[test]
    fn body_leads_with_system_prompt_and_requests_json() {
        let client = HttpInferenceClient::new(&config(), "sk-test".to_string()).expect("builds");
        let mut request = CompletionRequest::json("You score applicants.", "Score this.");
        request.messages.insert(
            0,
            ChatMessage {
                role: ChatRole::Assistant,
                content: "Hello".to_string(),
            },
        );

        let body = client.body(&request);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["messages"][2]["content"], "Score this.");
        assert_eq!(body["response_format"]["type"], "json_object");
    }
}
