//! PostgreSQL persistence
//!
//! One store per table family. Every store wraps a cloned [`PgPool`], maps
//! rows into the domain types of [`crate::models`] and reports failures as
//! [`LenteraError`].

pub mod blogs;
pub mod classes;
pub mod enrollments;
pub mod meeting_sessions;
pub mod sessions;
pub mod static_assets;
pub mod testimonies;
pub mod users;

pub use blogs::BlogStore;
pub use classes::ClassStore;
pub use enrollments::EnrollmentStore;
pub use meeting_sessions::MeetingSessionStore;
pub use sessions::{InMemorySessionStore, PgSessionStore, Session, SessionRepository};
pub use static_assets::StaticAssetStore;
pub use testimonies::TestimonyStore;
pub use users::UserStore;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions, PgQueryResult};
use sqlx::{Postgres, Transaction};
use std::fmt::Display;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::{LenteraError, Result};

/// Embedded schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open a connection pool
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.url)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("PostgreSQL connection failed: {e}")))
}

/// Apply pending migrations
pub async fn migrate(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Migration failed: {e}")))
}

/// Turn an UPDATE/DELETE that touched nothing into `NotFound`
pub(crate) fn ensure_affected(
    result: PgQueryResult,
    entity: &str,
    id: impl Display,
) -> Result<()> {
    if result.rows_affected() == 0 {
        return Err(LenteraError::NotFound(format!("{entity} {id}")));
    }
    Ok(())
}

pub(crate) async fn begin(pool: &PgPool) -> Result<Transaction<'static, Postgres>> {
    pool.begin()
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to start transaction: {e}")))
}

pub(crate) async fn commit(tx: Transaction<'static, Postgres>) -> Result<()> {
    tx.commit()
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to commit transaction: {e}")))
}
