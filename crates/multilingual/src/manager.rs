//! Multilingual manager: detection pipeline, translation gate, caching

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tour_agent_cache::CacheStore;
use tour_agent_config::constants::namespaces;
use tour_agent_core::Language;

use crate::detect;
use crate::translator::{GroqTranslator, TranslatorBackend};

/// Translation cache statistics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TranslationStats {
    pub translation_hits: u64,
    pub translation_misses: u64,
    pub translation_errors: u64,
    pub total_translations: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    total: AtomicU64,
}

/// Manager for the 18 supported languages
pub struct MultilingualManager {
    backend: Option<Arc<dyn TranslatorBackend>>,
    cache: Arc<CacheStore>,
    deadline: Duration,
    counters: Counters,
}

impl MultilingualManager {
    pub fn new(
        backend: Option<Arc<dyn TranslatorBackend>>,
        cache: Arc<CacheStore>,
        deadline: Duration,
    ) -> Self {
        // Startup invariant check; a violation is logged, not fatal.
        detect::verify_no_overlaps();

        if backend.is_some() {
            tracing::info!("multilingual manager with remote translator backend");
        } else {
            tracing::warn!("no translator backend configured, detection is local-only");
        }

        Self {
            backend,
            cache,
            deadline,
            counters: Counters::default(),
        }
    }

    /// Multi-stage language detection. Stages: script windows,
    /// distinctive whole words, remote LLM. Defaults to English.
    pub async fn detect_language(&self, text: &str) -> Language {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Language::En;
        }

        if let Some(lang) = detect::detect_by_script(trimmed) {
            return lang;
        }

        if let Some(lang) = detect::detect_by_words(trimmed) {
            return lang;
        }

        if let Some(backend) = &self.backend {
            let prompt = GroqTranslator::detection_prompt(trimmed);
            match tokio::time::timeout(self.deadline, backend.complete(&prompt, 10, 0.0)).await {
                Ok(Ok(reply)) => {
                    let code = reply.trim().to_lowercase();
                    if let Some(lang) = Language::from_code(&code) {
                        tracing::debug!(language = %lang, "remote detection");
                        return lang;
                    }
                    tracing::warn!(reply = %code, "remote detection returned unknown code");
                }
                Ok(Err(err)) => tracing::warn!(%err, "remote detection failed"),
                Err(_) => tracing::warn!("remote detection timed out"),
            }
        }

        tracing::warn!("all detection stages failed, defaulting to english");
        Language::En
    }

    /// False only for the corpus languages (en, ru); the other sixteen
    /// translate to English for better retrieval recall.
    pub fn should_translate_for_search(&self, language: Language) -> bool {
        !language.is_corpus_language()
    }

    /// Best-effort query translation to English. On deadline or network
    /// failure the original query is returned unchanged.
    pub async fn translate_query(&self, text: &str, source: Language) -> String {
        if source.is_corpus_language() || text.trim().is_empty() {
            return text.to_string();
        }

        let Some(backend) = &self.backend else {
            tracing::warn!("translation requested but no backend configured");
            return text.to_string();
        };

        let prompt = GroqTranslator::translation_prompt(text, Language::En);
        match tokio::time::timeout(self.deadline, backend.complete(&prompt, 150, 0.3)).await {
            Ok(Ok(translated)) => {
                let cleaned = translated
                    .trim()
                    .trim_matches('"')
                    .trim_matches('\'')
                    .to_string();
                tracing::info!(
                    source = %source,
                    original = %text.chars().take(40).collect::<String>(),
                    translated = %cleaned.chars().take(40).collect::<String>(),
                    "query translated for search"
                );
                cleaned
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, "translation failed, using original query");
                text.to_string()
            }
            Err(_) => {
                tracing::warn!("translation timed out, using original query");
                text.to_string()
            }
        }
    }

    /// Cached translation. Permanent entries are reserved for known
    /// attraction names; everything else lands in the temporary tier.
    pub async fn translate_if_needed(
        &self,
        text: &str,
        target: Language,
        source: Language,
        permanent: bool,
    ) -> String {
        if text.is_empty() || target == source {
            return text.to_string();
        }

        self.counters.total.fetch_add(1, Ordering::Relaxed);
        let cache_key = format!(
            "{:x}",
            md5::compute(format!("{text}:{}:{}", source.code(), target.code()))
        );

        for namespace in [namespaces::TRANSLATION_PERMANENT, namespaces::TRANSLATION_TEMP] {
            if let Some(cached) = self.cache.get::<String>(namespace, &cache_key).await {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return cached;
            }
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let Some(backend) = &self.backend else {
            return text.to_string();
        };

        let prompt = GroqTranslator::translation_prompt(text, target);
        let translated =
            match tokio::time::timeout(self.deadline, backend.complete(&prompt, 150, 0.3)).await {
                Ok(Ok(reply)) => reply.trim().trim_matches('"').trim_matches('\'').to_string(),
                Ok(Err(err)) => {
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(%err, "cached translation failed");
                    return text.to_string();
                }
                Err(_) => {
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    return text.to_string();
                }
            };

        if permanent {
            self.cache
                .set_permanent(namespaces::TRANSLATION_PERMANENT, &cache_key, &translated)
                .await;
        } else {
            self.cache
                .set(namespaces::TRANSLATION_TEMP, &cache_key, &translated, None)
                .await;
        }

        translated
    }

    /// The language-enforcement preamble for the generator prompt.
    /// Retrieved documents stay in their original language; the
    /// response must be entirely in the target language.
    pub fn language_instruction(&self, target: Language) -> String {
        let name = target.english_name();
        let upper = name.to_uppercase();
        format!(
            "---\n\
             SYSTEM: ROLE AND LANGUAGE INSTRUCTIONS\n\n\
             ROLE: You are an expert Georgian tourism guide. Your tone is engaging, helpful, and inspiring.\n\n\
             CONTEXT LANGUAGE: The context below is in its original language (Russian or English) for maximum accuracy.\n\n\
             TASK: Read the context and user's query carefully. Then generate a comprehensive, structured, and helpful response.\n\n\
             ---\n\
             CRITICAL: LANGUAGE REQUIREMENT\n\n\
             Your ENTIRE response MUST be written in: **{upper}**\n\n\
             RULES:\n\
             - Do NOT mix languages\n\
             - Exception: Keep proper nouns, names, titles (e.g., \"Svetitskhoveli\", \"Narikala\") in their original script if no common translation exists\n\
             - Write ALL headers, descriptions, and explanations in {name}\n\n\
             EXAMPLE (if target is French):\n\
             CORRECT: \"La cathédrale de Svetitskhoveli a été construite au 11ème siècle...\"\n\
             WRONG: \"The Svetitskhoveli cathedral was built in the 11th century...\"\n\n\
             ---\n\
             NOW BEGIN YOUR RESPONSE IN **{name}**:\n"
        )
    }

    pub fn stats(&self) -> TranslationStats {
        TranslationStats {
            translation_hits: self.counters.hits.load(Ordering::Relaxed),
            translation_misses: self.counters.misses.load(Ordering::Relaxed),
            translation_errors: self.counters.errors.load(Ordering::Relaxed),
            total_translations: self.counters.total.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::MultilingualError;

    struct FixedBackend(String);

    #[async_trait]
    impl TranslatorBackend for FixedBackend {
        async fn complete(
            &self,
            _prompt: &str,
            _max_tokens: usize,
            _temperature: f32,
        ) -> Result<String, MultilingualError> {
            Ok(self.0.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl TranslatorBackend for FailingBackend {
        async fn complete(
            &self,
            _prompt: &str,
            _max_tokens: usize,
            _temperature: f32,
        ) -> Result<String, MultilingualError> {
            Err(MultilingualError::Network("unreachable".to_string()))
        }
    }

    fn manager_with(backend: Option<Arc<dyn TranslatorBackend>>) -> MultilingualManager {
        MultilingualManager::new(
            backend,
            Arc::new(CacheStore::memory_only()),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_detection_short_circuits_on_script() {
        let manager = manager_with(None);
        assert_eq!(
            manager.detect_language("მითხარი თბილისის შესახებ").await,
            Language::Ka
        );
        assert_eq!(
            manager.detect_language("расскажи о Светицховели").await,
            Language::Ru
        );
    }

    #[tokio::test]
    async fn test_remote_fallback_validated_against_allow_list() {
        let manager = manager_with(Some(Arc::new(FixedBackend("tr".to_string()))));
        assert_eq!(manager.detect_language("merhaba dünya").await, Language::Tr);

        let manager = manager_with(Some(Arc::new(FixedBackend("tlh".to_string()))));
        assert_eq!(manager.detect_language("qapla qwerty").await, Language::En);
    }

    #[tokio::test]
    async fn test_empty_input_defaults_to_english() {
        let manager = manager_with(None);
        assert_eq!(manager.detect_language("   ").await, Language::En);
    }

    #[test]
    fn test_translation_gate() {
        let manager = manager_with(None);
        assert!(!manager.should_translate_for_search(Language::En));
        assert!(!manager.should_translate_for_search(Language::Ru));
        for lang in Language::ALL {
            if !lang.is_corpus_language() {
                assert!(manager.should_translate_for_search(lang));
            }
        }
    }

    #[tokio::test]
    async fn test_translate_query_best_effort_on_failure() {
        let manager = manager_with(Some(Arc::new(FailingBackend)));
        let original = "mir von tiflis erzählen";
        assert_eq!(
            manager.translate_query(original, Language::De).await,
            original
        );
    }

    #[tokio::test]
    async fn test_translate_query_strips_quotes() {
        let manager = manager_with(Some(Arc::new(FixedBackend(
            "\"tell me about Tbilisi\"".to_string(),
        ))));
        assert_eq!(
            manager.translate_query("erzähl mir von tiflis", Language::De).await,
            "tell me about Tbilisi"
        );
    }

    #[tokio::test]
    async fn test_translate_if_needed_hits_cache_second_time() {
        let manager = manager_with(Some(Arc::new(FixedBackend("bonjour".to_string()))));
        let first = manager
            .translate_if_needed("hello", Language::Fr, Language::En, false)
            .await;
        assert_eq!(first, "bonjour");

        let second = manager
            .translate_if_needed("hello", Language::Fr, Language::En, false)
            .await;
        assert_eq!(second, "bonjour");

        let stats = manager.stats();
        assert_eq!(stats.translation_hits, 1);
        assert_eq!(stats.translation_misses, 1);
    }

    #[test]
    fn test_language_instruction_names_target() {
        let manager = manager_with(None);
        let instruction = manager.language_instruction(Language::Ka);
        assert!(instruction.contains("**GEORGIAN**"));
        assert!(instruction.contains("Svetitskhoveli"));
    }
}
