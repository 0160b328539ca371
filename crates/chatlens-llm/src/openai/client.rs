// OpenAI-specific client implementation

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{LlmError, Result};
use crate::traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, TokenUsage};
use crate::types::Message;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI client (HTTP direct, no SDK)
pub struct OpenAIClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAIClient {
    /// Create new client with API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    pub fn builder() -> OpenAIClientBuilder {
        OpenAIClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build chat completion request payload
    fn build_chat_request(&self, model: &str, messages: &[Message], options: &ChatOptions) -> Result<Value> {
        if messages.is_empty() {
            return Err(LlmError::InvalidInput("at least one message is required".to_string()));
        }

        let mut request = serde_json::json!({
            "model": model,
            "messages": serde_json::to_value(messages).map_err(|e| LlmError::InvalidInput(e.to_string()))?,
        });

        // o1 and gpt-5 models take max_completion_tokens and no temperature
        let is_reasoning_model = model.starts_with("o1") || model.starts_with("gpt-5");

        if let Some(obj) = request.as_object_mut() {
            if let Some(temp) = options.temperature.filter(|_| !is_reasoning_model) {
                obj.insert("temperature".to_string(), serde_json::json!(temp));
            }
            if let Some(max_tokens) = options.max_tokens {
                let token_field = if is_reasoning_model {
                    "max_completion_tokens"
                } else {
                    "max_tokens"
                };
                obj.insert(token_field.to_string(), serde_json::json!(max_tokens));
            }
        }

        Ok(request)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response.text().await.unwrap_or_default();
        let err = LlmError::from_status(status.as_u16(), &error_text);
        tracing::warn!(status = status.as_u16(), reason = err.reason(), "OpenAI API error");
        Err(err)
    }
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_chat_request(&request.model, &request.messages, &request.options)?;

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&payload)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let raw: OpenAIChatResponse = serde_json::from_slice(&response.bytes().await?)?;

        // Convert to provider-agnostic response
        let choice = raw.choices.into_iter().next();
        Ok(ChatResponse {
            content: choice.as_ref().and_then(|c| c.message.content.clone()),
            finish_reason: choice.and_then(|c| c.finish_reason),
            usage: raw.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: raw.model,
        })
    }

    async fn validate_key(&self) -> Result<()> {
        let response = self
            .http_client
            .get(format!("{}/models", self.base_url))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

/// Builder for [`OpenAIClient`]
#[derive(Default)]
pub struct OpenAIClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl OpenAIClientBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API base, e.g. for a proxy or a local mock
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Per-request HTTP timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<OpenAIClient> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidInput("api_key is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
                .map_err(|_| LlmError::InvalidInput("Invalid API key format".to_string()))?,
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| OPENAI_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(OpenAIClient { http_client, base_url })
    }
}

// ============================================================================
// OPENAI-SPECIFIC RESPONSE TYPES (for Chat Completions)
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_key() {
        assert!(matches!(OpenAIClient::builder().build(), Err(LlmError::InvalidInput(_))));
        assert!(OpenAIClient::builder().api_key("  ").build().is_err());
    }

    #[test]
    fn test_payload_for_chat_model() {
        let client = OpenAIClient::new("sk-test").unwrap();
        let options = ChatOptions::new().temperature(0.7).max_tokens(2000);
        let payload = client
            .build_chat_request("gpt-4o-mini", &[Message::human("hi")], &options)
            .unwrap();

        assert_eq!(payload["max_tokens"], 2000);
        assert!(payload.get("temperature").is_some());
        assert_eq!(payload["messages"][0]["role"], "user");
    }

    #[test]
    fn test_payload_for_reasoning_model() {
        let client = OpenAIClient::new("sk-test").unwrap();
        let options = ChatOptions::new().temperature(0.7).max_tokens(500);
        let payload = client
            .build_chat_request("o1-mini", &[Message::human("hi")], &options)
            .unwrap();

        assert!(payload.get("temperature").is_none());
        assert_eq!(payload["max_completion_tokens"], 500);
    }

    #[test]
    fn test_empty_messages_rejected() {
        let client = OpenAIClient::new("sk-test").unwrap();
        let err = client
            .build_chat_request("gpt-4o", &[], &ChatOptions::default())
            .unwrap_err();
        assert_eq!(err.reason(), "invalid-input");
    }
}
