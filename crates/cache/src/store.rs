//! Namespaced two-tier cache store
//!
//! Entries written with `set` carry a TTL and may vanish; entries
//! written with `set_permanent` must never expire automatically — they
//! back expensive third-party fetches.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tour_agent_config::constants::{cache as cache_defaults, deadlines, namespaces};

use crate::remote::RemoteCache;

/// Per-namespace counters
#[derive(Default)]
pub struct NamespaceStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub sets: AtomicU64,
    pub errors: AtomicU64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NamespaceStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub errors: u64,
    pub total_requests: u64,
    pub hit_rate_percent: f64,
    pub is_permanent: bool,
}

struct MemoryEntry {
    value: Value,
    expires_at: Option<Instant>,
}

/// The cache store: remote tier plus guarded local memory tier
pub struct CacheStore {
    remote: Option<Arc<dyn RemoteCache>>,
    memory: DashMap<String, MemoryEntry>,
    default_ttl: Duration,
    remote_deadline: Duration,
    stats: DashMap<String, NamespaceStats>,
    permanent_sets: AtomicU64,
    temporary_sets: AtomicU64,
}

impl CacheStore {
    pub fn new(remote: Option<Arc<dyn RemoteCache>>, default_ttl: Duration) -> Self {
        let store = Self {
            remote,
            memory: DashMap::new(),
            default_ttl,
            remote_deadline: Duration::from_secs(deadlines::CACHE_SECS),
            stats: DashMap::new(),
            permanent_sets: AtomicU64::new(0),
            temporary_sets: AtomicU64::new(0),
        };

        for ns in namespaces::TEMPORARY.iter().chain(namespaces::PERMANENT.iter()) {
            store.stats.insert(ns.to_string(), NamespaceStats::default());
        }

        tracing::info!(
            remote = store.remote.is_some(),
            "cache store initialized (temporary TTL + permanent tiers)"
        );
        store
    }

    pub fn memory_only() -> Self {
        Self::new(None, Duration::from_secs(cache_defaults::DEFAULT_TTL_SECS))
    }

    fn make_key(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }

    fn bump(&self, namespace: &str, pick: impl Fn(&NamespaceStats) -> &AtomicU64) {
        let entry = self
            .stats
            .entry(namespace.to_string())
            .or_default();
        pick(entry.value()).fetch_add(1, Ordering::Relaxed);
    }

    /// Get a value; remote errors fall through to the memory tier.
    pub async fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let cache_key = Self::make_key(namespace, key);

        if let Some(remote) = &self.remote {
            match tokio::time::timeout(self.remote_deadline, remote.get(&cache_key)).await {
                Ok(Ok(Some(raw))) => match serde_json::from_str::<T>(&raw) {
                    Ok(value) => {
                        self.bump(namespace, |s| &s.hits);
                        tracing::debug!(namespace, "cache hit (remote)");
                        return Some(value);
                    }
                    Err(err) => {
                        self.bump(namespace, |s| &s.errors);
                        tracing::warn!(namespace, %err, "remote cache value undecodable");
                    }
                },
                Ok(Ok(None)) => {}
                Ok(Err(err)) => {
                    self.bump(namespace, |s| &s.errors);
                    tracing::warn!(namespace, %err, "remote cache get failed");
                }
                Err(_) => {
                    self.bump(namespace, |s| &s.errors);
                    tracing::warn!(namespace, "remote cache get timed out");
                }
            }
        }

        if let Some(entry) = self.memory.get(&cache_key) {
            let expired = entry
                .expires_at
                .map(|deadline| Instant::now() >= deadline)
                .unwrap_or(false);
            if !expired {
                if let Ok(value) = serde_json::from_value::<T>(entry.value.clone()) {
                    self.bump(namespace, |s| &s.hits);
                    tracing::debug!(namespace, "cache hit (memory)");
                    return Some(value);
                }
            } else {
                drop(entry);
                self.memory.remove(&cache_key);
            }
        }

        self.bump(namespace, |s| &s.misses);
        None
    }

    /// Set with TTL (temporary tier). A remote failure does not prevent
    /// the local write.
    pub async fn set<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        let cache_key = Self::make_key(namespace, key);
        let ttl = ttl.unwrap_or(self.default_ttl);

        let json_value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(err) => {
                self.bump(namespace, |s| &s.errors);
                tracing::error!(namespace, %err, "cache set serialization failed");
                return false;
            }
        };

        if let Some(remote) = &self.remote {
            let raw = json_value.to_string();
            match tokio::time::timeout(self.remote_deadline, remote.set_ex(&cache_key, &raw, ttl))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    self.bump(namespace, |s| &s.errors);
                    tracing::warn!(namespace, %err, "remote cache set failed");
                }
                Err(_) => {
                    self.bump(namespace, |s| &s.errors);
                    tracing::warn!(namespace, "remote cache set timed out");
                }
            }
        }

        self.memory.insert(
            cache_key,
            MemoryEntry {
                value: json_value,
                expires_at: Some(Instant::now() + ttl),
            },
        );

        self.bump(namespace, |s| &s.sets);
        self.temporary_sets.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Set without TTL (permanent tier). The entry must never expire.
    pub async fn set_permanent<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> bool {
        let cache_key = Self::make_key(namespace, key);

        let json_value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(err) => {
                self.bump(namespace, |s| &s.errors);
                tracing::error!(namespace, %err, "permanent cache set serialization failed");
                return false;
            }
        };

        if let Some(remote) = &self.remote {
            let raw = json_value.to_string();
            match tokio::time::timeout(self.remote_deadline, remote.set(&cache_key, &raw)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    self.bump(namespace, |s| &s.errors);
                    tracing::warn!(namespace, %err, "remote permanent set failed");
                }
                Err(_) => {
                    self.bump(namespace, |s| &s.errors);
                    tracing::warn!(namespace, "remote permanent set timed out");
                }
            }
        }

        self.memory.insert(
            cache_key,
            MemoryEntry {
                value: json_value,
                expires_at: None,
            },
        );

        self.bump(namespace, |s| &s.sets);
        self.permanent_sets.fetch_add(1, Ordering::Relaxed);
        tracing::info!(namespace, "permanent cache save");
        true
    }

    pub async fn has_permanent(&self, namespace: &str, key: &str) -> bool {
        self.get::<Value>(namespace, key).await.is_some()
    }

    /// Clear all keys in a namespace, remotely and locally. Returns the
    /// number of keys removed.
    pub async fn clear_namespace(&self, namespace: &str) -> usize {
        let prefix = format!("{namespace}:");
        let mut count = 0;

        if let Some(remote) = &self.remote {
            match tokio::time::timeout(self.remote_deadline, remote.keys(&prefix)).await {
                Ok(Ok(keys)) if !keys.is_empty() => {
                    match tokio::time::timeout(self.remote_deadline, remote.delete(&keys)).await {
                        Ok(Ok(removed)) => count += removed,
                        Ok(Err(err)) => {
                            tracing::warn!(namespace, %err, "remote clear failed")
                        }
                        Err(_) => tracing::warn!(namespace, "remote clear timed out"),
                    }
                }
                Ok(Ok(_)) => {}
                Ok(Err(err)) => tracing::warn!(namespace, %err, "remote key scan failed"),
                Err(_) => tracing::warn!(namespace, "remote key scan timed out"),
            }
        }

        let local_keys: Vec<String> = self
            .memory
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| key.starts_with(&prefix))
            .collect();
        for key in &local_keys {
            self.memory.remove(key);
        }
        count += local_keys.len();

        tracing::info!(namespace, count, "cleared cache namespace");
        count
    }

    pub fn namespace_stats(&self, namespace: &str) -> NamespaceStatsSnapshot {
        let (hits, misses, sets, errors) = self
            .stats
            .get(namespace)
            .map(|s| {
                (
                    s.hits.load(Ordering::Relaxed),
                    s.misses.load(Ordering::Relaxed),
                    s.sets.load(Ordering::Relaxed),
                    s.errors.load(Ordering::Relaxed),
                )
            })
            .unwrap_or_default();

        let total = hits + misses;
        NamespaceStatsSnapshot {
            hits,
            misses,
            sets,
            errors,
            total_requests: total,
            hit_rate_percent: if total > 0 {
                hits as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            is_permanent: namespace.ends_with(":permanent"),
        }
    }

    pub fn stats(&self) -> Value {
        let mut temporary = serde_json::Map::new();
        for ns in namespaces::TEMPORARY {
            temporary.insert(
                ns.to_string(),
                serde_json::to_value(self.namespace_stats(ns)).unwrap_or(Value::Null),
            );
        }

        let mut permanent = serde_json::Map::new();
        for ns in namespaces::PERMANENT {
            permanent.insert(
                ns.to_string(),
                serde_json::to_value(self.namespace_stats(ns)).unwrap_or(Value::Null),
            );
        }

        serde_json::json!({
            "memory_cache_size": self.memory.len(),
            "remote_connected": self.remote.is_some(),
            "permanent_sets": self.permanent_sets.load(Ordering::Relaxed),
            "temporary_sets": self.temporary_sets.load(Ordering::Relaxed),
            "temporary_namespaces": temporary,
            "permanent_namespaces": permanent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryRemote;
    use tour_agent_config::constants::namespaces;

    fn store_with_remote() -> CacheStore {
        CacheStore::new(
            Some(Arc::new(InMemoryRemote::new())),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = store_with_remote();
        store
            .set(namespaces::TRANSLATION_TEMP, "abc", &"привет", None)
            .await;

        let value: Option<String> = store.get(namespaces::TRANSLATION_TEMP, "abc").await;
        assert_eq!(value, Some("привет".to_string()));

        let stats = store.namespace_stats(namespaces::TRANSLATION_TEMP);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.sets, 1);
    }

    #[tokio::test]
    async fn test_permanent_survives_ttl_and_temporary_writes() {
        let store = CacheStore::new(
            Some(Arc::new(InMemoryRemote::new())),
            Duration::from_millis(10),
        );

        store
            .set_permanent(namespaces::ENRICHMENT_PERMANENT, "place", &"enriched")
            .await;
        for i in 0..5 {
            store
                .set(
                    namespaces::ENRICHMENT_TEMP,
                    &format!("k{i}"),
                    &i,
                    Some(Duration::from_millis(5)),
                )
                .await;
        }
        tokio::time::sleep(Duration::from_millis(30)).await;

        let value: Option<String> = store.get(namespaces::ENRICHMENT_PERMANENT, "place").await;
        assert_eq!(value, Some("enriched".to_string()));

        let expired: Option<i32> = store.get(namespaces::ENRICHMENT_TEMP, "k0").await;
        assert_eq!(expired, None);
    }

    #[tokio::test]
    async fn test_memory_only_mode() {
        let store = CacheStore::memory_only();
        store.set(namespaces::PREFILTER, "q", &vec![1, 2, 3], None).await;
        let value: Option<Vec<i32>> = store.get(namespaces::PREFILTER, "q").await;
        assert_eq!(value, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_clear_namespace_counts_and_isolates() {
        let store = store_with_remote();
        store.set(namespaces::BM25_RESULTS, "a", &1, None).await;
        store.set(namespaces::BM25_RESULTS, "b", &2, None).await;
        store.set(namespaces::DENSE_RESULTS, "c", &3, None).await;

        let cleared = store.clear_namespace(namespaces::BM25_RESULTS).await;
        // remote + local copies both counted
        assert!(cleared >= 2);

        let gone: Option<i32> = store.get(namespaces::BM25_RESULTS, "a").await;
        assert_eq!(gone, None);
        let kept: Option<i32> = store.get(namespaces::DENSE_RESULTS, "c").await;
        assert_eq!(kept, Some(3));
    }
}
