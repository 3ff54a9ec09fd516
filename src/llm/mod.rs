use async_trait::async_trait;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::core::config::LlmConfig;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM is not configured: {0}")]
    NotConfigured(String),
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("LLM returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("LLM response was malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub owned_by: Option<String>,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError>;
}

pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl OpenAIClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 1000,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::NotConfigured("missing api_key".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!("LLM endpoint returned {}: {}", status, body);
        Err(LlmError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        trace!("LLM request: model={}, messages={}", self.model, messages.len());

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": messages,
                "max_tokens": self.max_tokens
            }))
            .send()
            .await?;

        let result: Value = Self::check_status(response).await?.json().await?;
        let raw_content = result["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::Malformed("missing choices[0].message.content".to_string()))?;

        // Some reasoning models prefix their answer with a channel marker.
        let end_token = "final<|message|>";
        let content = match raw_content.find(end_token) {
            Some(pos) => &raw_content[(pos + end_token.len())..],
            None => raw_content,
        };

        Ok(content.trim().to_string())
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        #[derive(Deserialize)]
        struct ModelList {
            data: Vec<ModelInfo>,
        }

        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let list: ModelList = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        Ok(list.data)
    }
}
