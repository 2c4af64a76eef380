//! Result cache for the retrieval engines
//!
//! Stores final ranked results keyed by a content hash so the cache
//! survives across unrelated candidate sets. TTL per entry; when full,
//! the oldest entry is evicted.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Statistics snapshot for one result cache
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResultCacheStats {
    pub cache_size: usize,
    pub max_cache_size: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate: f64,
    pub total_requests: u64,
    pub ttl_seconds: u64,
}

/// TTL + evict-oldest cache of cloneable values
pub struct ResultCache<V: Clone> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    max_size: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_size,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(entry) => entry.stored_at.elapsed() > self.ttl,
        };

        if expired {
            entries.remove(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.lock();

        if entries.len() >= self.max_size {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest_key) = oldest {
                entries.remove(&oldest_key);
            }
        }

        entries.insert(
            key.into(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ResultCacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        ResultCacheStats {
            cache_size: self.entries.lock().len(),
            max_cache_size: self.max_size,
            cache_hits: hits,
            cache_misses: misses,
            hit_rate: if total > 0 {
                (hits as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
            } else {
                0.0
            },
            total_requests: total,
            ttl_seconds: self.ttl.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_miss_accounting() {
        let cache: ResultCache<Vec<u32>> = ResultCache::new(10, Duration::from_secs(60));
        assert!(cache.get("missing").is_none());

        cache.insert("key", vec![1, 2]);
        assert_eq!(cache.get("key"), Some(vec![1, 2]));

        let stats = cache.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.total_requests, 2);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache: ResultCache<u32> = ResultCache::new(10, Duration::from_millis(0));
        cache.insert("key", 7);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("key").is_none());
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let cache: ResultCache<u32> = ResultCache::new(2, Duration::from_secs(60));
        cache.insert("first", 1);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("second", 2);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("third", 3);

        assert!(cache.get("first").is_none());
        assert_eq!(cache.get("second"), Some(2));
        assert_eq!(cache.get("third"), Some(3));
    }
}
