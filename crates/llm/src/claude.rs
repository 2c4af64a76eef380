//! Claude backend
//!
//! Implements the Anthropic Messages API for single-turn, non-streaming
//! completions. The generator treats this as `complete(prompt) → text`
//! plus token usage.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use tour_agent_config::GeneratorConfig;

use crate::LlmError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the Claude backend
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
    pub endpoint: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 800,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
            endpoint: "https://api.anthropic.com".to_string(),
        }
    }
}

impl From<&GeneratorConfig> for ClaudeConfig {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
            endpoint: config.endpoint.clone(),
        }
    }
}

/// A completed generation with token accounting
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: String,
}

/// Blocking completion call: one prompt in, one completion out
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError>;

    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<MessageParam<'a>>,
}

#[derive(Serialize)]
struct MessageParam<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Claude Messages API client
pub struct ClaudeBackend {
    config: ClaudeConfig,
    client: Client,
}

impl ClaudeBackend {
    pub fn new(config: ClaudeConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Configuration(
                "ANTHROPIC_API_KEY not set. Set it via environment or config.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl CompletionBackend for ClaudeBackend {
    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![MessageParam {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.endpoint))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Network(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ApiError>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "unreadable error body".to_string());
            return Err(LlmError::Api(format!("HTTP {status}: {message}")));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = body
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(LlmError::InvalidResponse("empty completion".to_string()));
        }

        Ok(Completion {
            text,
            input_tokens: body.usage.input_tokens,
            output_tokens: body.usage.output_tokens,
            model: self.config.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_requires_api_key() {
        let config = ClaudeConfig {
            api_key: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            ClaudeBackend::new(config),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn test_config_from_generator_settings() {
        let generator = GeneratorConfig {
            api_key: "sk-test".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 800,
            temperature: 0.7,
            timeout_secs: 30,
            endpoint: "https://api.anthropic.com".to_string(),
        };
        let config = ClaudeConfig::from(&generator);
        assert_eq!(config.max_tokens, 800);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
