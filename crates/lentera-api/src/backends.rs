//! Backend selection at startup
//!
//! A backend that is configured must be reachable, otherwise startup fails.
//! Only an unconfigured backend falls back to its in-process stand-in, which
//! loses its contents on restart and is meant for local development.

use lentera_core::config::{CacheConfig, MailConfig, StorageConfig};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CacheError, CacheStore, MemoryCache, RedisCache};
use crate::mail::{LogMailer, MailError, Mailer, SmtpMailer};
use crate::storage::{MemoryStorage, ObjectStorage, S3Storage, StorageError};

pub async fn connect_cache(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    if !config.is_configured() {
        warn!("Redis not configured, one-time tokens are kept in process memory");
        return Ok(Arc::new(MemoryCache::new()));
    }

    let cache = RedisCache::connect(&config.redis_url).await?;
    cache.ping().await?;
    Ok(Arc::new(cache))
}

pub async fn object_storage(
    config: &StorageConfig,
) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    if !config.is_configured() {
        warn!("S3 storage not configured, uploads are kept in process memory");
        return Ok(Arc::new(MemoryStorage::new()));
    }

    let storage = S3Storage::new(config);
    storage.ping().await?;
    info!(bucket = %config.bucket, "S3 bucket reachable");
    Ok(Arc::new(storage))
}

pub fn mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    if !config.is_configured() {
        warn!("SMTP not configured, outgoing emails are only logged");
        return Ok(Arc::new(LogMailer::new()));
    }

    info!(host = %config.smtp_host, "Using SMTP mailer");
    Ok(Arc::new(SmtpMailer::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_backends_use_memory() {
        let cache = connect_cache(&CacheConfig::default()).await.unwrap();
        assert!(cache.ping().await.is_ok());

        let storage = object_storage(&StorageConfig::default()).await.unwrap();
        assert!(storage.ping().await.is_ok());

        assert!(mailer(&MailConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_configured_but_unreachable_redis_fails() {
        let config = CacheConfig {
            redis_url: "redis://127.0.0.1:1/0".to_string(),
        };
        assert!(connect_cache(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_redis_url_fails() {
        let config = CacheConfig {
            redis_url: "not a url".to_string(),
        };
        assert!(matches!(
            connect_cache(&config).await,
            Err(CacheError::Connection(_))
        ));
    }
}
