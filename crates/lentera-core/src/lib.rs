//! Lentera Core - domain models, configuration and persistence
//!
//! This crate holds everything the HTTP layer and the CLI share:
//! - Domain entities (users, classes, meeting sessions, content)
//! - The common error type
//! - Configuration management
//! - Password hashing
//! - PostgreSQL repositories and embedded migrations

pub mod config;
pub mod db;
pub mod models;
pub mod password;

pub use config::{AppConfig, ConfigError};
pub use models::*;

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error type for Lentera operations
#[derive(Error, Debug)]
pub enum LenteraError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LenteraError {
    /// Map a sqlx error, turning unique violations into conflicts
    pub fn from_sqlx(context: &str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                LenteraError::Conflict(format!("{context}: record already exists"))
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                LenteraError::ValidationError(format!("{context}: referenced record missing"))
            }
            _ => LenteraError::DatabaseError(format!("{context}: {err}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, LenteraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = LenteraError::NotFound("Class".to_string());
        assert_eq!(err.to_string(), "Class not found");
    }

    #[test]
    fn test_from_sqlx_row_not_found_is_database_error() {
        let err = LenteraError::from_sqlx("Failed to fetch user", sqlx::Error::RowNotFound);
        assert!(matches!(err, LenteraError::DatabaseError(msg) if msg.starts_with("Failed to fetch user")));
    }
}
