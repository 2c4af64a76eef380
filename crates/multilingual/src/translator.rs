//! Remote translator / detector backend
//!
//! An OpenAI-compatible chat-completions client (Groq-hosted Llama by
//! default). Both detection fallback and query translation go through
//! short single-turn prompts with small token budgets.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use tour_agent_config::TranslatorConfig;
use tour_agent_core::Language;

use crate::MultilingualError;

/// Backend for the short remote-LLM calls the dispatch layer makes
#[async_trait]
pub trait TranslatorBackend: Send + Sync {
    /// One instruction in, one short completion out
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: usize,
        temperature: f32,
    ) -> Result<String, MultilingualError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Groq-hosted chat-completions client
pub struct GroqTranslator {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl GroqTranslator {
    pub fn new(config: &TranslatorConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;

        Some(Self {
            client,
            api_key,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        })
    }

    /// Prompt asking for a bare ISO 639-1 reply
    pub fn detection_prompt(text: &str) -> String {
        let clipped: String = text.chars().take(200).collect();
        format!(
            "What language is this? Reply with ONLY the ISO 639-1 code \
             (en, ru, ka, ko, ja, zh, ar, de, fr, es, it, nl, pl, cs, tr, hi, hy, az):\n\n{clipped}"
        )
    }

    /// Minimal prompt for fast translation
    pub fn translation_prompt(text: &str, target: Language) -> String {
        format!(
            "Translate this to {}. Return ONLY the translation:\n\n{text}",
            target.english_name()
        )
    }
}

#[async_trait]
impl TranslatorBackend for GroqTranslator {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: usize,
        temperature: f32,
    ) -> Result<String, MultilingualError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MultilingualError::Translation(format!(
                "translator returned HTTP {}",
                response.status()
            )));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| MultilingualError::Translation("empty completion".to_string()))?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_prompt_clips_input() {
        let long_text = "წ".repeat(500);
        let prompt = GroqTranslator::detection_prompt(&long_text);
        assert!(prompt.chars().filter(|c| *c == 'წ').count() == 200);
        assert!(prompt.contains("ISO 639-1"));
    }

    #[test]
    fn test_translation_prompt_names_target() {
        let prompt = GroqTranslator::translation_prompt("mündən danış", Language::En);
        assert!(prompt.starts_with("Translate this to English"));
    }

    #[test]
    fn test_backend_requires_api_key() {
        let config = TranslatorConfig {
            api_key: None,
            ..Default::default()
        };
        assert!(GroqTranslator::new(&config).is_none());
    }
}
