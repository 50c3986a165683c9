//! Single-use, purpose-scoped tokens kept in the cache
//!
//! A token is issued unused, becomes used on the first successful
//! validation and can never be consumed again. Entries carry their own
//! expiry and also live under a cache TTL, so an expired token disappears
//! on its own; one caught past its expiry during validation is deleted
//! right away.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use utoipa::ToSchema;

use crate::cache::{CacheError, CacheStore};

const KEY_PREFIX: &str = "one_time_token:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    AccountActivation,
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::AccountActivation => "account_activation",
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

impl std::fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored token metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OneTimeToken {
    pub user_id: i32,
    pub token: String,
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl OneTimeToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Error)]
pub enum OneTimeTokenError {
    #[error("Token not found")]
    NotFound,

    #[error("Token has already been used")]
    AlreadyUsed,

    #[error("Token was issued for a different purpose")]
    PurposeMismatch,

    #[error("Token has expired")]
    Expired,

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Stored token is unreadable: {0}")]
    Corrupted(String),
}

/// Issues and consumes one-time tokens
#[derive(Clone)]
pub struct OneTimeTokenService {
    cache: Arc<dyn CacheStore>,
}

fn cache_key(token: &str) -> String {
    format!("{KEY_PREFIX}{token}")
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl OneTimeTokenService {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    pub async fn generate(
        &self,
        user_id: i32,
        purpose: TokenPurpose,
        ttl: std::time::Duration,
    ) -> Result<OneTimeToken, OneTimeTokenError> {
        let lifetime = Duration::from_std(ttl).map_err(|e| OneTimeTokenError::Corrupted(e.to_string()))?;
        let token = OneTimeToken {
            user_id,
            token: random_token(),
            purpose,
            expires_at: Utc::now() + lifetime,
            used: false,
        };

        self.store(&token, ttl).await?;
        debug!(user_id, purpose = %purpose, "Issued one-time token");
        Ok(token)
    }

    /// Consume `token` for `expected`
    ///
    /// Checked in order: presence, prior use, purpose, expiry. The used
    /// marker is written with a compare-and-set against the value that was
    /// read, so of two concurrent calls only one can succeed.
    pub async fn validate(
        &self,
        token: &str,
        expected: TokenPurpose,
    ) -> Result<OneTimeToken, OneTimeTokenError> {
        let key = cache_key(token);
        let raw = self.cache.get(&key).await?.ok_or(OneTimeTokenError::NotFound)?;
        let mut entry = parse(&raw)?;

        if entry.used {
            return Err(OneTimeTokenError::AlreadyUsed);
        }
        if entry.purpose != expected {
            return Err(OneTimeTokenError::PurposeMismatch);
        }

        let now = Utc::now();
        if entry.is_expired_at(now) {
            self.cache.delete(&key).await?;
            return Err(OneTimeTokenError::Expired);
        }

        entry.used = true;
        let remaining = (entry.expires_at - now)
            .to_std()
            .unwrap_or_default()
            .max(std::time::Duration::from_secs(1));
        let consumed = serialize(&entry)?;
        if !self
            .cache
            .compare_and_set(&key, &raw, &consumed, remaining)
            .await?
        {
            return Err(OneTimeTokenError::AlreadyUsed);
        }

        Ok(entry)
    }

    pub async fn invalidate(&self, token: &str) -> Result<(), OneTimeTokenError> {
        self.cache.delete(&cache_key(token)).await?;
        Ok(())
    }

    /// Read-only peek; never consumes
    pub async fn check_status(&self, token: &str) -> Result<Option<OneTimeToken>, OneTimeTokenError> {
        self.load(token).await
    }

    async fn store(
        &self,
        token: &OneTimeToken,
        ttl: std::time::Duration,
    ) -> Result<(), OneTimeTokenError> {
        self.cache
            .set(&cache_key(&token.token), &serialize(token)?, ttl)
            .await?;
        Ok(())
    }

    async fn load(&self, token: &str) -> Result<Option<OneTimeToken>, OneTimeTokenError> {
        match self.cache.get(&cache_key(token)).await? {
            Some(raw) => parse(&raw).map(Some),
            None => Ok(None),
        }
    }
}

fn serialize(token: &OneTimeToken) -> Result<String, OneTimeTokenError> {
    serde_json::to_string(token).map_err(|e| OneTimeTokenError::Corrupted(e.to_string()))
}

fn parse(raw: &str) -> Result<OneTimeToken, OneTimeTokenError> {
    serde_json::from_str(raw).map_err(|e| OneTimeTokenError::Corrupted(e.to_string()))
}
