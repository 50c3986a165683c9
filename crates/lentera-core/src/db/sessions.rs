//! Refresh-token sessions
//!
//! Each user owns at most one session row. Writing a new refresh token
//! replaces the previous one, which is what makes an older refresh token
//! unusable after a second login. Tokens are stored as SHA-256 digests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{LenteraError, Result};

/// The live session of one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i32,
    pub token_hash: String,
    pub updated_at: DateTime<Utc>,
}

/// SHA-256 hex digest of a refresh token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Storage for refresh-token sessions
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert or replace the session of `user_id`
    async fn upsert_session(&self, user_id: i32, refresh_token: &str) -> Result<()>;

    /// Whether `refresh_token` is the current token of `user_id`
    async fn session_exists(&self, user_id: i32, refresh_token: &str) -> Result<bool>;

    /// Remove the session of `user_id`; no-op when absent
    async fn invalidate_session(&self, user_id: i32) -> Result<()>;

    async fn get_session(&self, user_id: i32) -> Result<Option<Session>>;
}

/// `user_has_tokens` backed sessions
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SessionRow {
    user_id: i32,
    token: String,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            user_id: row.user_id,
            token_hash: row.token,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl SessionRepository for PgSessionStore {
    async fn upsert_session(&self, user_id: i32, refresh_token: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_has_tokens (user_id, token)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET token = EXCLUDED.token, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(hash_token(refresh_token))
        .execute(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to store session", e))?;

        Ok(())
    }

    async fn session_exists(&self, user_id: i32, refresh_token: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_has_tokens WHERE user_id = $1 AND token = $2)",
        )
        .bind(user_id)
        .bind(hash_token(refresh_token))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to check session: {e}")))
    }

    async fn invalidate_session(&self, user_id: i32) -> Result<()> {
        sqlx::query("DELETE FROM user_has_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| LenteraError::DatabaseError(format!("Failed to delete session: {e}")))?;

        Ok(())
    }

    async fn get_session(&self, user_id: i32) -> Result<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT user_id, token, updated_at FROM user_has_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to get session: {e}")))?;

        Ok(row.map(Session::from))
    }
}

/// Process-local sessions for tests and single-node development
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<i32, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionStore {
    async fn upsert_session(&self, user_id: i32, refresh_token: &str) -> Result<()> {
        let session = Session {
            user_id,
            token_hash: hash_token(refresh_token),
            updated_at: Utc::now(),
        };
        self.sessions.write().await.insert(user_id, session);
        Ok(())
    }

    async fn session_exists(&self, user_id: i32, refresh_token: &str) -> Result<bool> {
        let digest = hash_token(refresh_token);
        Ok(self
            .sessions
            .read()
            .await
            .get(&user_id)
            .is_some_and(|s| s.token_hash == digest))
    }

    async fn invalidate_session(&self, user_id: i32) -> Result<()> {
        self.sessions.write().await.remove(&user_id);
        Ok(())
    }

    async fn get_session(&self, user_id: i32) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let digest = hash_token("refresh");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_token("refresh"));
        assert_ne!(digest, hash_token("refresh2"));
    }

    #[test]
    fn test_upsert_supersedes_previous_token() {
        let store = InMemorySessionStore::new();

        tokio_test::block_on(async {
            store.upsert_session(1, "first").await.unwrap();
            store.upsert_session(1, "second").await.unwrap();

            assert!(!store.session_exists(1, "first").await.unwrap());
            assert!(store.session_exists(1, "second").await.unwrap());
            assert!(!store.session_exists(2, "second").await.unwrap());
        });
    }

    #[tokio::test]
    async fn test_invalidate_removes_session() {
        let store = InMemorySessionStore::new();
        store.upsert_session(5, "token").await.unwrap();
        assert!(store.get_session(5).await.unwrap().is_some());

        store.invalidate_session(5).await.unwrap();
        assert!(store.get_session(5).await.unwrap().is_none());

        // removing again is harmless
        store.invalidate_session(5).await.unwrap();
    }
}
