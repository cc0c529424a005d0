use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{Cache, CacheError};

/// Process-local cache with per-entry expiry, checked on read.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .map(|m| m.values().filter(|(_, exp)| *exp > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> CacheError {
    CacheError::Backend("cache lock poisoned".to_string())
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let map = self.entries.read().map_err(|_| poisoned())?;
            match map.get(key) {
                Some((value, expires)) if *expires > now => return Ok(Some(value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: drop it.
        let mut map = self.entries.write().map_err(|_| poisoned())?;
        if map.get(key).is_some_and(|(_, exp)| *exp <= now) {
            map.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut map = self.entries.write().map_err(|_| poisoned())?;
        if ttl.is_zero() {
            map.remove(key);
            return Ok(());
        }
        map.insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_expire() {
        let cache = InMemoryCache::new();
        cache.set("a", "1".into(), Duration::from_millis(20)).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap().as_deref(), Some("1"));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn zero_ttl_is_not_readable() {
        let cache = InMemoryCache::new();
        cache.set("a", "1".into(), Duration::from_secs(60)).await.unwrap();
        cache.set("a", "2".into(), Duration::ZERO).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = InMemoryCache::new();
        cache.set("a", "1".into(), Duration::from_secs(60)).await.unwrap();
        cache.delete("a").await.unwrap();
        cache.delete("missing").await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), None);
    }
}
