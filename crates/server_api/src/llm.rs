//! Chat-completion transport for the OpenAI-compatible providers.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::domain::ModelFamily;
use thiserror::Error;

pub const OPENAI_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEEPSEEK_COMPLETIONS_URL: &str = "https://api.deepseek.com/v1/chat/completions";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),
    #[error("{0} API key not found")]
    MissingApiKey(&'static str),
    #[error("API request failed for {model}: {source}")]
    Transport {
        model: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("API request failed for {model}: status {status}: {body}")]
    Status {
        model: String,
        status: u16,
        body: String,
    },
    #[error("failed to parse content from {0} response")]
    MalformedResponse(String),
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub openai: ProviderEndpoint,
    pub deepseek: ProviderEndpoint,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai: ProviderEndpoint {
                url: OPENAI_COMPLETIONS_URL.to_string(),
                api_key: None,
            },
            deepseek: ProviderEndpoint {
                url: DEEPSEEK_COMPLETIONS_URL.to_string(),
                api_key: None,
            },
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct HttpChatClient {
    http: Client,
    endpoints: HashMap<ModelFamily, ProviderEndpoint>,
}

impl HttpChatClient {
    pub fn new(config: LlmConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.timeout).build()?;
        let endpoints = HashMap::from([
            (ModelFamily::OpenAi, config.openai),
            (ModelFamily::DeepSeek, config.deepseek),
        ]);
        Ok(Self { http, endpoints })
    }

    fn endpoint_for(&self, model: &str) -> Result<(&str, &str), LlmError> {
        let family = ModelFamily::for_model(model)
            .ok_or_else(|| LlmError::UnsupportedModel(model.to_string()))?;
        let endpoint = self
            .endpoints
            .get(&family)
            .ok_or_else(|| LlmError::UnsupportedModel(model.to_string()))?;
        let api_key = endpoint
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(LlmError::MissingApiKey(family.label()))?;
        Ok((endpoint.url.as_str(), api_key))
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatCompletion for HttpChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let (url, api_key) = self.endpoint_for(&request.model)?;
        let model = request.model.clone();

        tracing::debug!(%model, messages = request.messages.len(), "sending chat completion");
        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| LlmError::Transport {
                model: model.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%model, status = status.as_u16(), "chat completion rejected");
            return Err(LlmError::Status {
                model,
                status: status.as_u16(),
                body,
            });
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|_| LlmError::MalformedResponse(model.clone()))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or(LlmError::MalformedResponse(model))
    }
}

#[cfg(test)]
#[path = "tests/llm_tests.rs"]
mod tests;
