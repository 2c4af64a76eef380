//! Multilingual answer generator
//!
//! Builds a two-part prompt (language preamble + English body chosen by
//! intent) and invokes the external LLM under a hard deadline. The
//! generator never fails the request: deadline and API errors degrade
//! to canned localized messages.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use tour_agent_core::{Language, QueryIntent};
use tour_agent_multilingual::{DisclaimerManager, MultilingualManager};

use crate::claude::CompletionBackend;
use crate::prompt;
use crate::LlmError;

/// One shaped result for the prompt, produced by the context assembler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResult {
    pub rank: usize,
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub location_full: String,
    pub tags: Vec<String>,
    pub score: f32,
    pub has_image: bool,
    pub image_url: Option<String>,
    pub original_language: String,
}

/// One image descriptor available to the prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextImage {
    pub place: String,
    pub url: String,
    pub source: String,
    pub photographer: Option<String>,
}

/// Enrichment view the generator interpolates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentBlock {
    pub summary: String,
    pub sources: Vec<String>,
    pub additional_images: usize,
}

/// Query routing information carried through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInfo {
    pub original_query: String,
    pub search_query: String,
    pub detected_language: Language,
    pub target_language: Language,
    pub query_was_translated: bool,
    pub intent: QueryIntent,
}

/// The generator's input struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerContext {
    pub query_info: QueryInfo,
    pub search_results: Vec<ContextResult>,
    pub enrichment: Option<EnrichmentBlock>,
    pub images: Vec<ContextImage>,
    pub total_results: usize,
    pub results_with_images: usize,
    #[serde(default)]
    pub conversation_history: Option<String>,
}

/// A generated answer with accounting
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedAnswer {
    pub response: String,
    pub language: Language,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: String,
    pub with_disclaimer: bool,
    pub error: Option<String>,
}

/// Response generator enforcing the target language in output
pub struct ResponseGenerator {
    backend: Arc<dyn CompletionBackend>,
    multilingual: Arc<MultilingualManager>,
    disclaimer: DisclaimerManager,
    deadline: Duration,
}

impl ResponseGenerator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        multilingual: Arc<MultilingualManager>,
        deadline: Duration,
    ) -> Self {
        Self {
            backend,
            multilingual,
            disclaimer: DisclaimerManager::new(),
            deadline,
        }
    }

    /// Generate the answer directly in the target language.
    /// Deadline and API failures degrade to canned localized messages.
    pub async fn generate(&self, context: &AnswerContext) -> GeneratedAnswer {
        let target = context.query_info.target_language;
        let prompt_text = self.build_prompt(context);

        tracing::info!(target = %target, "calling generator");

        let completion =
            match tokio::time::timeout(self.deadline, self.backend.complete(&prompt_text)).await {
                Ok(Ok(completion)) => completion,
                Ok(Err(LlmError::Timeout)) | Err(_) => {
                    tracing::error!(target = %target, "generation timed out");
                    return GeneratedAnswer {
                        response: prompt::timeout_message(target).to_string(),
                        language: target,
                        input_tokens: 0,
                        output_tokens: 0,
                        model: self.backend.model_name().to_string(),
                        with_disclaimer: false,
                        error: Some("timeout".to_string()),
                    };
                }
                Ok(Err(err)) => {
                    tracing::error!(target = %target, %err, "generation failed");
                    return GeneratedAnswer {
                        response: prompt::error_message(target).to_string(),
                        language: target,
                        input_tokens: 0,
                        output_tokens: 0,
                        model: self.backend.model_name().to_string(),
                        with_disclaimer: false,
                        error: Some(err.to_string()),
                    };
                }
            };

        tracing::info!(
            target = %target,
            chars = completion.text.len(),
            "generation completed"
        );

        let with_disclaimers = self.disclaimer.add_disclaimers(&completion.text, target);
        let with_disclaimer = with_disclaimers.len() > completion.text.len();

        GeneratedAnswer {
            response: with_disclaimers,
            language: target,
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            model: completion.model,
            with_disclaimer,
            error: None,
        }
    }

    /// Language preamble plus the English body for the intent
    fn build_prompt(&self, context: &AnswerContext) -> String {
        let target = context.query_info.target_language;
        let instruction = self.multilingual.language_instruction(target);
        let body = fill_template(prompt::base_prompt(context.query_info.intent), context);

        let mut prompt_text = format!("{instruction}\n\n{body}");
        if let Some(history) = &context.conversation_history {
            if !history.is_empty() {
                prompt_text.push_str("\n\nCONVERSATION SO FAR:\n");
                prompt_text.push_str(history);
            }
        }
        prompt_text
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

/// Interpolate the assembled context into the prompt body.
/// Descriptions are trimmed to ~300 chars, enrichment to ~200.
fn fill_template(template: &str, context: &AnswerContext) -> String {
    let mut results_text = String::new();
    for result in context.search_results.iter().take(3) {
        let description = truncate_chars(&result.description, 300);

        results_text.push_str(&format!(
            "\nName: {}\nDescription: {}\nCategory: {}\nLocation: {}\nRelevance: {:.3}\n",
            result.name, description, result.category, result.location, result.score
        ));
        if let Some(url) = &result.image_url {
            results_text.push_str(&format!("Photo available: {url}\n"));
        }
    }

    let enrichment_text = context
        .enrichment
        .as_ref()
        .filter(|e| !e.summary.is_empty())
        .map(|e| format!("Additional Info: {}\n", truncate_chars(&e.summary, 200)))
        .unwrap_or_default();

    let images_text = if context.images.is_empty() {
        "No photos available".to_string()
    } else {
        let lines: Vec<String> = context
            .images
            .iter()
            .take(5)
            .map(|img| format!("{}: {}", img.place, img.url))
            .collect();
        format!("Available photos:\n{}", lines.join("\n"))
    };

    template
        .replace("{query}", &context.query_info.original_query)
        .replace("{total_results}", &context.total_results.to_string())
        .replace("{results}", &results_text)
        .replace("{enrichment}", &enrichment_text)
        .replace("{images}", &images_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claude::Completion;
    use async_trait::async_trait;
    use tour_agent_cache::CacheStore;

    struct EchoBackend;

    #[async_trait]
    impl CompletionBackend for EchoBackend {
        async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
            Ok(Completion {
                text: format!("echo:{}", prompt.len()),
                input_tokens: 10,
                output_tokens: 5,
                model: "test-model".to_string(),
            })
        }

        fn model_name(&self) -> &str {
            "test-model"
        }
    }

    struct SlowBackend;

    #[async_trait]
    impl CompletionBackend for SlowBackend {
        async fn complete(&self, _prompt: &str) -> Result<Completion, LlmError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!()
        }

        fn model_name(&self) -> &str {
            "slow-model"
        }
    }

    fn multilingual() -> Arc<MultilingualManager> {
        Arc::new(MultilingualManager::new(
            None,
            Arc::new(CacheStore::memory_only()),
            Duration::from_secs(1),
        ))
    }

    fn context(target: Language) -> AnswerContext {
        AnswerContext {
            query_info: QueryInfo {
                original_query: "расскажи о Светицховели".to_string(),
                search_query: "tell me about Svetitskhoveli".to_string(),
                detected_language: Language::Ru,
                target_language: target,
                query_was_translated: true,
                intent: QueryIntent::Factual,
            },
            search_results: vec![ContextResult {
                rank: 1,
                name: "Svetitskhoveli".to_string(),
                description: "Cathedral in Mtskheta".to_string(),
                category: "church".to_string(),
                location: "Mtskheta".to_string(),
                location_full: "Mtskheta, Georgia".to_string(),
                tags: vec!["cathedral".to_string()],
                score: 4.2,
                has_image: false,
                image_url: None,
                original_language: "RU".to_string(),
            }],
            enrichment: None,
            images: vec![],
            total_results: 1,
            results_with_images: 0,
            conversation_history: None,
        }
    }

    #[tokio::test]
    async fn test_generation_flows_through_backend() {
        let generator = ResponseGenerator::new(
            Arc::new(EchoBackend),
            multilingual(),
            Duration::from_secs(5),
        );
        let answer = generator.generate(&context(Language::Ka)).await;

        assert!(answer.error.is_none());
        assert!(answer.response.starts_with("echo:"));
        assert_eq!(answer.language, Language::Ka);
        assert_eq!(answer.output_tokens, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_canned_localized_message() {
        let generator = ResponseGenerator::new(
            Arc::new(SlowBackend),
            multilingual(),
            Duration::from_secs(30),
        );
        let answer = generator.generate(&context(Language::Ka)).await;

        assert_eq!(answer.error.as_deref(), Some("timeout"));
        assert_eq!(answer.response, prompt::timeout_message(Language::Ka));
    }

    #[test]
    fn test_prompt_contains_instruction_and_body() {
        let generator = ResponseGenerator::new(
            Arc::new(EchoBackend),
            multilingual(),
            Duration::from_secs(5),
        );
        let prompt_text = generator.build_prompt(&context(Language::Fr));

        assert!(prompt_text.contains("**FRENCH**"));
        assert!(prompt_text.contains("расскажи о Светицховели"));
        assert!(prompt_text.contains("Svetitskhoveli"));
        // documents stay untranslated in the body
        assert!(prompt_text.contains("Cathedral in Mtskheta"));
    }

    #[test]
    fn test_description_truncation() {
        let mut ctx = context(Language::En);
        ctx.search_results[0].description = "д".repeat(500);
        let filled = fill_template(prompt::base_prompt(QueryIntent::Factual), &ctx);
        assert!(filled.contains(&format!("{}...", "д".repeat(300))));
    }
}
