//! In-process cache

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{CacheError, CacheStore};

/// HashMap cache; expired entries are dropped when read and swept on every
/// write
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, deadline)| *deadline > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Entries held, expired ones included
    pub async fn stored(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn sweep(entries: &mut HashMap<String, (String, Instant)>, now: Instant) {
    entries.retain(|_, (_, deadline)| *deadline > now);
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        sweep(&mut entries, now);
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let matches = matches!(
            entries.get(key),
            Some((current, deadline)) if *deadline > now && current == expected
        );
        if matches {
            entries.insert(key.to_string(), (value.to_string(), now + ttl));
        }
        Ok(matches)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));

        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_unread_expired_entries_swept_on_write() {
        let cache = MemoryCache::new();
        for key in ["a", "b", "c"] {
            cache.set(key, "v", Duration::from_millis(10)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(30)).await;

        cache.set("fresh", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.stored().await, 1);
    }

    #[tokio::test]
    async fn test_compare_and_set() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("k", "old", ttl).await.unwrap();

        assert!(!cache.compare_and_set("k", "other", "new", ttl).await.unwrap());
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("old"));

        assert!(cache.compare_and_set("k", "old", "new", ttl).await.unwrap());
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));

        // a second swap from the same starting value loses
        assert!(!cache.compare_and_set("k", "old", "newer", ttl).await.unwrap());
        assert!(!cache.compare_and_set("missing", "old", "new", ttl).await.unwrap());
    }
}
