//! Classes

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::ensure_affected;
use crate::models::{Class, ClassOption};
use crate::{LenteraError, Result};

#[derive(Clone)]
pub struct ClassStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct ClassRow {
    id: Uuid,
    classname: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ClassRow> for Class {
    fn from(row: ClassRow) -> Self {
        Class {
            id: row.id,
            classname: row.classname,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl ClassStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, classname: &str) -> Result<Class> {
        let row: ClassRow = sqlx::query_as(
            r#"
            INSERT INTO classes (classname) VALUES ($1)
            RETURNING id, classname, created_at, updated_at
            "#,
        )
        .bind(classname.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to create class", e))?;

        Ok(row.into())
    }

    pub async fn list(&self) -> Result<Vec<Class>> {
        let rows: Vec<ClassRow> = sqlx::query_as(
            r#"
            SELECT id, classname, created_at, updated_at
            FROM classes
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to list classes: {e}")))?;

        Ok(rows.into_iter().map(Class::from).collect())
    }

    pub async fn dropdown(&self) -> Result<Vec<ClassOption>> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT id, classname FROM classes WHERE deleted_at IS NULL ORDER BY classname",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to list classes: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, classname)| ClassOption { id, classname })
            .collect())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Class>> {
        let row: Option<ClassRow> = sqlx::query_as(
            r#"
            SELECT id, classname, created_at, updated_at
            FROM classes
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to get class: {e}")))?;

        Ok(row.map(Class::from))
    }

    pub async fn update(&self, id: Uuid, classname: &str) -> Result<Class> {
        let row: Option<ClassRow> = sqlx::query_as(
            r#"
            UPDATE classes SET classname = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, classname, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(classname.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to update class", e))?;

        row.map(Class::from)
            .ok_or_else(|| LenteraError::NotFound(format!("Class {id}")))
    }

    pub async fn soft_delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE classes SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to delete class: {e}")))?;

        ensure_affected(result, "Class", id)
    }

    pub async fn restore(&self, id: Uuid) -> Result<Class> {
        let row: Option<ClassRow> = sqlx::query_as(
            r#"
            UPDATE classes SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NOT NULL
            RETURNING id, classname, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to restore class: {e}")))?;

        row.map(Class::from)
            .ok_or_else(|| LenteraError::NotFound(format!("Deleted class {id}")))
    }
}
