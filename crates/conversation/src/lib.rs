//! Conversation history store
//!
//! Remote-cache-first persistence with a guarded in-memory fallback.
//! Conversations live for a TTL window from last update, keep at most
//! `max_history` messages, and expose a token-budgeted context window.
//! Chat is advisory, not transactional: concurrent writes to the same
//! conversation are last-writer-wins.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use tour_agent_cache::RemoteCache;
use tour_agent_config::constants::conversation as defaults;
use tour_agent_core::{Message, MessageRole};

use thiserror::Error;

/// Conversation store errors
#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<ConversationError> for tour_agent_core::Error {
    fn from(err: ConversationError) -> Self {
        tour_agent_core::Error::Conversation(err.to_string())
    }
}

/// Conversation metadata. The set fields serialize as sorted lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationMetadata {
    pub total_messages: usize,
    #[serde(default)]
    pub languages_used: BTreeSet<String>,
    #[serde(default)]
    pub sources_used: BTreeSet<String>,
}

/// A stored conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub metadata: ConversationMetadata,
}

impl Conversation {
    fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            metadata: ConversationMetadata::default(),
        }
    }
}

/// Context window formats
#[derive(Debug, Clone)]
pub enum ContextWindow {
    Text(String),
    Messages(Vec<Message>),
}

#[derive(Debug, Clone, serde::Serialize, Default)]
pub struct ConversationStats {
    pub total_conversations: u64,
    pub total_messages: u64,
    pub remote_hits: u64,
    pub remote_misses: u64,
    pub errors: u64,
    pub in_memory_conversations: usize,
}

/// Conversation history manager
pub struct ConversationStore {
    remote: Option<Arc<dyn RemoteCache>>,
    memory: RwLock<HashMap<String, Conversation>>,
    max_history: usize,
    ttl: Duration,
    conversations: AtomicU64,
    messages: AtomicU64,
    remote_hits: AtomicU64,
    remote_misses: AtomicU64,
    errors: AtomicU64,
}

impl ConversationStore {
    pub fn new(remote: Option<Arc<dyn RemoteCache>>, max_history: usize, ttl: Duration) -> Self {
        tracing::info!(
            remote = remote.is_some(),
            max_history,
            "conversation store initialized"
        );
        Self {
            remote,
            memory: RwLock::new(HashMap::new()),
            max_history,
            ttl,
            conversations: AtomicU64::new(0),
            messages: AtomicU64::new(0),
            remote_hits: AtomicU64::new(0),
            remote_misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(remote: Option<Arc<dyn RemoteCache>>) -> Self {
        Self::new(
            remote,
            defaults::MAX_HISTORY,
            Duration::from_secs(defaults::TTL_SECS),
        )
    }

    fn remote_key(conversation_id: &str) -> String {
        format!("conversation:{conversation_id}")
    }

    /// Create a conversation, or return the existing one
    pub async fn create(&self, conversation_id: Option<String>) -> Conversation {
        let id = conversation_id
            .unwrap_or_else(|| format!("conv_{}", &Uuid::new_v4().simple().to_string()[..12]));

        if let Some(existing) = self.load(&id).await {
            return existing;
        }

        let conversation = Conversation::new(&id);
        self.save(&conversation).await;
        self.conversations.fetch_add(1, Ordering::Relaxed);

        tracing::info!(conversation_id = %id, "created conversation");
        conversation
    }

    /// Append a message, updating metadata and trimming history
    pub async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> bool {
        let mut conversation = match self.load(conversation_id).await {
            Some(conv) => conv,
            None => self.create(Some(conversation_id.to_string())).await,
        };

        if let Some(language) = metadata.get("language").and_then(Value::as_str) {
            conversation
                .metadata
                .languages_used
                .insert(language.to_string());
        }
        if let Some(sources) = metadata.get("sources").and_then(Value::as_array) {
            for source in sources.iter().filter_map(Value::as_str) {
                conversation.metadata.sources_used.insert(source.to_string());
            }
        }

        conversation
            .messages
            .push(Message::new(role, content).with_metadata(metadata));
        conversation.updated_at = Utc::now();

        if conversation.messages.len() > self.max_history {
            let excess = conversation.messages.len() - self.max_history;
            conversation.messages.drain(0..excess);
            tracing::debug!(conversation_id, excess, "trimmed old messages");
        }
        conversation.metadata.total_messages = conversation.messages.len();

        self.save(&conversation).await;
        self.messages.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Message history, newest last
    pub async fn history(&self, conversation_id: &str, limit: Option<usize>) -> Vec<Message> {
        let Some(conversation) = self.load(conversation_id).await else {
            return Vec::new();
        };

        match limit {
            Some(limit) if conversation.messages.len() > limit => {
                conversation.messages[conversation.messages.len() - limit..].to_vec()
            }
            _ => conversation.messages,
        }
    }

    /// Token-budgeted context window: walk newest-first until the
    /// budget is spent, return in chronological order.
    pub async fn context_window(
        &self,
        conversation_id: &str,
        max_tokens: usize,
        as_messages: bool,
    ) -> ContextWindow {
        let messages = self.history(conversation_id, None).await;
        let max_chars = max_tokens * defaults::CHARS_PER_TOKEN;

        if as_messages {
            let mut window = Vec::new();
            let mut total = 0usize;
            for message in messages.iter().rev() {
                let cost = message.content.chars().count() + 50;
                if total + cost > max_chars {
                    break;
                }
                window.push(message.clone());
                total += cost;
            }
            window.reverse();
            return ContextWindow::Messages(window);
        }

        let mut parts = Vec::new();
        let mut total = 0usize;
        for message in messages.iter().rev() {
            let line = format!(
                "{}: {}\n",
                message.role.as_str().to_uppercase(),
                message.content
            );
            let cost = line.chars().count();
            if total + cost > max_chars {
                break;
            }
            parts.push(line);
            total += cost;
        }
        parts.reverse();
        ContextWindow::Text(parts.join("\n"))
    }

    /// Metadata without messages
    pub async fn metadata(&self, conversation_id: &str) -> Option<Value> {
        let conversation = self.load(conversation_id).await?;
        Some(serde_json::json!({
            "id": conversation.id,
            "created_at": conversation.created_at,
            "updated_at": conversation.updated_at,
            "metadata": conversation.metadata,
        }))
    }

    /// Delete a conversation completely
    pub async fn clear(&self, conversation_id: &str) -> bool {
        if let Some(remote) = &self.remote {
            if let Err(err) = remote.delete(&[Self::remote_key(conversation_id)]).await {
                tracing::warn!(conversation_id, %err, "remote conversation delete failed");
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.memory.write().remove(conversation_id);
        tracing::info!(conversation_id, "cleared conversation");
        true
    }

    pub fn stats(&self) -> ConversationStats {
        ConversationStats {
            total_conversations: self.conversations.load(Ordering::Relaxed),
            total_messages: self.messages.load(Ordering::Relaxed),
            remote_hits: self.remote_hits.load(Ordering::Relaxed),
            remote_misses: self.remote_misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            in_memory_conversations: self.memory.read().len(),
        }
    }

    /// Remote tier is authoritative; memory is a fallback cache
    async fn load(&self, conversation_id: &str) -> Option<Conversation> {
        if let Some(remote) = &self.remote {
            match remote.get(&Self::remote_key(conversation_id)).await {
                Ok(Some(raw)) => {
                    self.remote_hits.fetch_add(1, Ordering::Relaxed);
                    match serde_json::from_str::<Conversation>(&raw) {
                        Ok(conversation) => return Some(conversation),
                        Err(err) => {
                            self.errors.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(conversation_id, %err, "stored conversation undecodable");
                        }
                    }
                }
                Ok(None) => {
                    self.remote_misses.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    self.errors.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(conversation_id, %err, "remote conversation load failed");
                }
            }
        }

        self.memory.read().get(conversation_id).cloned()
    }

    async fn save(&self, conversation: &Conversation) {
        if let Some(remote) = &self.remote {
            match serde_json::to_string(conversation) {
                Ok(raw) => {
                    if let Err(err) = remote
                        .set_ex(&Self::remote_key(&conversation.id), &raw, self.ttl)
                        .await
                    {
                        self.errors.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(conversation_id = %conversation.id, %err, "remote conversation save failed");
                    }
                }
                Err(err) => {
                    self.errors.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(%err, "conversation serialization failed");
                }
            }
        }

        self.memory
            .write()
            .insert(conversation.id.clone(), conversation.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tour_agent_cache::InMemoryRemote;

    fn store() -> ConversationStore {
        ConversationStore::new(
            Some(Arc::new(InMemoryRemote::new())),
            5,
            Duration::from_secs(60),
        )
    }

    fn meta(language: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("language".to_string(), json!(language));
        map
    }

    #[tokio::test]
    async fn test_append_and_history() {
        let store = store();
        store
            .add_message("c1", MessageRole::User, "привет", meta("ru"))
            .await;
        store
            .add_message("c1", MessageRole::Assistant, "გამარჯობა", meta("ka"))
            .await;

        let history = store.history("c1", None).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_history_trimmed_to_max() {
        let store = store();
        for i in 0..10 {
            store
                .add_message("c1", MessageRole::User, format!("msg {i}"), Map::new())
                .await;
        }

        let history = store.history("c1", None).await;
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].content, "msg 5");
    }

    #[tokio::test]
    async fn test_metadata_sets_serialize_sorted() {
        let store = store();
        store
            .add_message("c1", MessageRole::User, "hi", meta("ru"))
            .await;
        store
            .add_message("c1", MessageRole::User, "hi", meta("en"))
            .await;
        store
            .add_message("c1", MessageRole::User, "hi", meta("ka"))
            .await;

        let metadata = store.metadata("c1").await.unwrap();
        let languages: Vec<String> =
            serde_json::from_value(metadata["metadata"]["languages_used"].clone()).unwrap();
        assert_eq!(languages, vec!["en", "ka", "ru"]);
    }

    #[tokio::test]
    async fn test_context_window_budget_newest_first() {
        let store = store();
        for i in 0..5 {
            store
                .add_message("c1", MessageRole::User, format!("message number {i}"), Map::new())
                .await;
        }

        // tight budget keeps only the newest messages, in order
        let window = store.context_window("c1", 15, false).await;
        let ContextWindow::Text(text) = window else {
            panic!("expected text window");
        };
        assert!(text.contains("message number 4"));
        assert!(!text.contains("message number 0"));

        let ends_in_order = text.find("message number 3").unwrap_or(usize::MAX)
            < text.find("message number 4").unwrap_or(0);
        assert!(ends_in_order);
    }

    #[tokio::test]
    async fn test_survives_remote_loss() {
        // memory-only store still works
        let store = ConversationStore::new(None, 5, Duration::from_secs(60));
        store
            .add_message("c1", MessageRole::User, "hello", Map::new())
            .await;
        assert_eq!(store.history("c1", None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_everywhere() {
        let store = store();
        store
            .add_message("c1", MessageRole::User, "hello", Map::new())
            .await;
        store.clear("c1").await;
        assert!(store.history("c1", None).await.is_empty());
    }
}
