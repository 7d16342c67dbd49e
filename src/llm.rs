//! LLM client used by every model-driven stage
//!
//! Supports OpenAI-compatible chat completions and Claude (Anthropic) APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{CallError, ConfigError};

const SERVICE: &str = "llm";

/// Pipeline stage a model call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Lemma,
    Translation,
    Meaning,
    MeaningGeneration,
    FullAnalysis,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Lemma => "lemma",
            Stage::Translation => "translation",
            Stage::Meaning => "meaning",
            Stage::MeaningGeneration => "meaning-generation",
            Stage::FullAnalysis => "full-analysis",
        }
    }
}

/// A single chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub stage: Stage,
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Anything that can answer a chat completion request.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, CallError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    Claude,
    OpenAi,
}

/// LLM client for making API requests
pub struct LlmClient {
    client: Client,
    config: Config,
    provider: Provider,
    api_key: String,
}

// Claude API types
#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: String,
    max_tokens: u32,
    system: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

// OpenAI API types
#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: String,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessageResponse,
}

#[derive(Deserialize)]
struct OpenAiMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

impl LlmClient {
    /// Create a new LLM client sharing the given connection pool
    pub fn new(client: Client, config: Config) -> Result<Self, ConfigError> {
        let provider = match config.llm.provider.as_str() {
            "claude" => Provider::Claude,
            "openai" => Provider::OpenAi,
            "none" => return Err(ConfigError::MissingCredential(SERVICE)),
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        };
        let api_key = config
            .get_api_key()
            .ok_or(ConfigError::MissingCredential(SERVICE))?;

        Ok(Self {
            client,
            config,
            provider,
            api_key,
        })
    }

    fn base_url(&self) -> String {
        self.config.llm.base_url.clone().unwrap_or_else(|| match self.provider {
            Provider::Claude => "https://api.anthropic.com".to_string(),
            Provider::OpenAi => "https://api.openai.com".to_string(),
        })
    }

    async fn call_once(&self, request: &ChatRequest) -> Result<String, CallError> {
        let text = match self.provider {
            Provider::Claude => self.call_claude(request).await?,
            Provider::OpenAi => self.call_openai(request).await?,
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(CallError::Empty { service: SERVICE });
        }
        Ok(text.to_string())
    }

    /// Call Claude API
    async fn call_claude(&self, request: &ChatRequest) -> Result<String, CallError> {
        let body = ClaudeRequest {
            model: self.config.get_model(),
            max_tokens: self.config.llm.max_tokens,
            system: &request.system,
            temperature: request.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.user,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url()))
            .timeout(self.config.llm_timeout())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(SERVICE, e))?;

        let response = check_status(response).await?;
        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| CallError::from_reqwest(SERVICE, e))?;

        claude_response
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or(CallError::Empty { service: SERVICE })
    }

    /// Call OpenAI-compatible API
    async fn call_openai(&self, request: &ChatRequest) -> Result<String, CallError> {
        let body = OpenAiRequest {
            model: self.config.get_model(),
            max_tokens: self.config.llm.max_tokens,
            temperature: request.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url()))
            .timeout(self.config.llm_timeout())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(SERVICE, e))?;

        let response = check_status(response).await?;
        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| CallError::from_reqwest(SERVICE, e))?;

        openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(CallError::Empty { service: SERVICE })
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, CallError> {
        let max_attempts = self.config.llm.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            tracing::debug!("{} call attempt {} of {}", request.stage.as_str(), attempt, max_attempts);

            match self.call_once(request).await {
                Ok(text) => return Ok(text),
                Err(err @ CallError::Transport { .. }) => {
                    tracing::warn!("{} call attempt {} failed: {}", request.stage.as_str(), attempt, err);
                    last_error = Some(err);
                    if attempt < max_attempts {
                        let backoff = self.config.llm.backoff_ms * u64::from(attempt);
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                }
                Err(err) => {
                    tracing::warn!("{} call failed without retry: {}", request.stage.as_str(), err);
                    return Err(err);
                }
            }
        }

        Err(last_error.unwrap_or(CallError::Empty { service: SERVICE }))
    }
}

/// Turn a non-success status into a `CallError::Status`
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CallError> {
    check_status_for(SERVICE, response).await
}

pub(crate) async fn check_status_for(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, CallError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(CallError::Status { service, status, body })
}
