//! Key/value cache used for hot reads (e.g. the current-user profile).
//!
//! Cache failures never fail a request: [`get_json`] and [`set_json`] log
//! the error and behave like a miss.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use in_memory::InMemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` for `ttl`. A zero ttl stores nothing readable.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key, error = %e, "cache read failed");
            None
        }
    }
}

pub async fn set_json<T: Serialize + Sync>(cache: &dyn Cache, key: &str, value: &T, ttl: Duration) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(key, error = %e, "cache value not serializable");
            return;
        }
    };
    if let Err(e) = cache.set(key, raw, ttl).await {
        tracing::warn!(key, error = %e, "cache write failed");
    }
}

pub async fn invalidate(cache: &dyn Cache, key: &str) {
    if let Err(e) = cache.delete(key).await {
        tracing::warn!(key, error = %e, "cache delete failed");
    }
}
