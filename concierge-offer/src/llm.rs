use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use concierge_store::app_config::LlmConfig;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("{message}")]
    InvalidResponse { message: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Chat-completion style language model
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Raw text content of the first choice
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

pub struct OpenAiClient {
    http: Client,
    url: String,
    headers: HeaderMap,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    /// `None` when no API key is configured
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>, LlmError> {
        let Some(api_key) = config.api_key.as_deref() else {
            return Ok(None);
        };

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", api_key).parse()?);

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Some(Self {
            http,
            url: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            headers,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "response_format": { "type": "json_object" },
            "messages": messages,
        });

        let res = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await?;
        let json: Value = res.error_for_status()?.json().await?;

        choice_content(&json)
    }
}

fn choice_content(json: &Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| LlmError::InvalidResponse {
            message: "Completion response is missing message content.".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_first_choice_content() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "{\"insights\": []}" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        });
        assert_eq!(choice_content(&json).unwrap(), "{\"insights\": []}");
    }

    #[test]
    fn test_missing_content_is_invalid() {
        let json = serde_json::json!({ "choices": [] });
        assert!(matches!(
            choice_content(&json),
            Err(LlmError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_unconfigured_client_is_none() {
        assert!(OpenAiClient::from_config(&LlmConfig::default()).unwrap().is_none());

        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            api_base: "https://llm.local/v1/".to_string(),
            ..LlmConfig::default()
        };
        let client = OpenAiClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.url, "https://llm.local/v1/chat/completions");
    }
}
