//! Remote cache client seam
//!
//! The remote cache is an external collaborator: when it is missing or
//! unreachable the store operates in memory-only mode. The trait
//! mirrors the small command set the store needs.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::CacheError;

/// Minimal remote key/value interface
#[async_trait]
pub trait RemoteCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set with TTL
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Set without TTL; the entry must never expire
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError>;

    /// Keys matching a `prefix*` pattern
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}

/// In-process remote stand-in, used when no remote cache is configured
/// and by tests. Honors TTLs.
#[derive(Default)]
pub struct InMemoryRemote {
    entries: DashMap<String, (String, Option<Instant>)>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        let (value, expires_at) = entry.value();
        match expires_at {
            Some(deadline) if Instant::now() >= *deadline => {
                drop(entry);
                self.entries.remove(key);
                None
            }
            _ => Some(value.clone()),
        }
    }
}

#[async_trait]
impl RemoteCache for InMemoryRemote {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.live(key))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            (value.to_string(), Some(Instant::now() + ttl)),
        );
        Ok(())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), (value.to_string(), None));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
        let mut removed = 0;
        for key in keys {
            if self.entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| key.starts_with(prefix))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ttl_expiry() {
        let remote = InMemoryRemote::new();
        remote
            .set_ex("k", "v", Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(remote.get("k").await.unwrap(), Some("v".to_string()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(remote.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_permanent_set_survives() {
        let remote = InMemoryRemote::new();
        remote.set("perm", "forever").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(remote.get("perm").await.unwrap(), Some("forever".to_string()));
    }

    #[tokio::test]
    async fn test_prefix_scan_and_delete() {
        let remote = InMemoryRemote::new();
        remote.set("ns:a", "1").await.unwrap();
        remote.set("ns:b", "2").await.unwrap();
        remote.set("other:c", "3").await.unwrap();

        let mut keys = remote.keys("ns:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["ns:a", "ns:b"]);

        let removed = remote.delete(&keys).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(remote.get("ns:a").await.unwrap(), None);
    }
}
