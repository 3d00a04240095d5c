//! Caches for parsed remote tag lists
//!
//! Entries are keyed by a SHA-256 of the input text. Cache failures are
//! logged and treated as misses.

use crate::cache::{keys, Cache};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Storage for tags parsed from successful remote responses
#[async_trait]
pub trait TagCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<String>>;

    async fn put(&self, key: &str, tags: &[String], ttl: Duration);
}

/// Content hash used as the cache key
pub fn content_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Process-local cache with per-entry expiry
#[derive(Default)]
pub struct MemoryTagCache {
    entries: RwLock<HashMap<String, (Instant, Vec<String>)>>,
}

impl MemoryTagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops `key` if its entry is still expired under the write lock.
    /// A `put` may have replaced it since the read.
    async fn evict_if_expired(&self, key: &str) {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        if entries.get(key).is_some_and(|(expires_at, _)| *expires_at <= now) {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl TagCache for MemoryTagCache {
    async fn get(&self, key: &str) -> Option<Vec<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((expires_at, tags)) if *expires_at > Instant::now() => {
                    return Some(tags.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        self.evict_if_expired(key).await;
        None
    }

    async fn put(&self, key: &str, tags: &[String], ttl: Duration) {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (expires_at, _)| *expires_at > now);
        entries.insert(key.to_string(), (now + ttl, tags.to_vec()));
    }
}

/// Cache shared through Redis
pub struct RedisTagCache {
    cache: Arc<Cache>,
}

impl RedisTagCache {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl TagCache for RedisTagCache {
    async fn get(&self, key: &str) -> Option<Vec<String>> {
        match self.cache.get::<Vec<String>>(&keys::tags(key)).await {
            Ok(tags) => tags,
            Err(e) => {
                tracing::warn!(error = %e, "Tag cache read failed, treating as miss");
                None
            }
        }
    }

    async fn put(&self, key: &str, tags: &[String], ttl: Duration) {
        if let Err(e) = self.cache.set_with_ttl(&keys::tags(key), &tags, ttl.as_secs()).await {
            tracing::warn!(error = %e, "Failed to cache tags, continuing without cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_key_is_stable() {
        let a = content_key("Deep learning for protein folding");
        let b = content_key("Deep learning for protein folding");
        let c = content_key("Deep learning for protein folding.");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_memory_cache_hit() {
        let cache = MemoryTagCache::new();
        let tags = vec!["ai".to_string(), "nlp".to_string()];

        cache.put("k", &tags, Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some(tags));
        assert_eq!(cache.get("other").await, None);
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryTagCache::new();
        cache.put("k", &["ai".to_string()], Duration::from_millis(20)).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn test_eviction_keeps_entry_refreshed_after_read() {
        let cache = MemoryTagCache::new();
        cache.put("k", &["old".to_string()], Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        // a reader saw the stale entry, then a writer refreshed it
        let fresh = vec!["new".to_string()];
        cache.put("k", &fresh, Duration::from_secs(60)).await;
        cache.evict_if_expired("k").await;
        assert_eq!(cache.get("k").await, Some(fresh));

        cache.put("gone", &["x".to_string()], Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.evict_if_expired("gone").await;
        assert!(!cache.entries.read().await.contains_key("gone"));
    }
}
