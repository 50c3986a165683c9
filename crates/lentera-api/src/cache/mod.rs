//! Key-value cache with per-entry TTL
//!
//! Redis in production; an in-memory map for tests and for running without
//! a Redis server.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection failed: {0}")]
    Connection(String),

    #[error("Cache command failed: {0}")]
    Command(String),
}

impl From<CacheError> for lentera_core::LenteraError {
    fn from(err: CacheError) -> Self {
        lentera_core::LenteraError::CacheError(err.to_string())
    }
}

/// String values with expiry; every operation is atomic per key
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Overwrite `key` with `value` only while it still holds `expected`;
    /// returns whether the write happened
    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    /// Round-trip check used by the readiness check
    async fn ping(&self) -> Result<(), CacheError>;
}
