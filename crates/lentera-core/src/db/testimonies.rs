//! Testimonies shown on the landing page
//!
//! The photo column holds an object key, never a URL. Replacing or
//! deleting the object is the caller's job, so updates hand back the
//! previous key.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::ensure_affected;
use crate::models::{Testimony, TestimonyDraft};
use crate::{LenteraError, Result};

const TESTIMONY_COLUMNS: &str = "id, testimoner_name, testimoner_current_position, \
     testimoner_previous_position, testimoner_photo, testimony_text, created_at, updated_at";

#[derive(Clone)]
pub struct TestimonyStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct TestimonyRow {
    id: i32,
    testimoner_name: String,
    testimoner_current_position: String,
    testimoner_previous_position: String,
    testimoner_photo: Option<String>,
    testimony_text: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<TestimonyRow> for Testimony {
    fn from(row: TestimonyRow) -> Self {
        Testimony {
            id: row.id,
            testimoner_name: row.testimoner_name,
            testimoner_current_position: row.testimoner_current_position,
            testimoner_previous_position: row.testimoner_previous_position,
            testimoner_photo: row.testimoner_photo,
            testimony_text: row.testimony_text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl TestimonyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, draft: &TestimonyDraft, photo: Option<&str>) -> Result<Testimony> {
        let row: TestimonyRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO testimonials (
                testimoner_name, testimoner_current_position,
                testimoner_previous_position, testimoner_photo, testimony_text
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING {TESTIMONY_COLUMNS}
            "#
        ))
        .bind(draft.testimoner_name.trim())
        .bind(draft.testimoner_current_position.trim())
        .bind(draft.testimoner_previous_position.trim())
        .bind(photo)
        .bind(&draft.testimony_text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to create testimony", e))?;

        Ok(row.into())
    }

    pub async fn list(&self) -> Result<Vec<Testimony>> {
        let rows: Vec<TestimonyRow> = sqlx::query_as(&format!(
            "SELECT {TESTIMONY_COLUMNS} FROM testimonials WHERE deleted_at IS NULL ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to list testimonies: {e}")))?;

        Ok(rows.into_iter().map(Testimony::from).collect())
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Testimony>> {
        let row: Option<TestimonyRow> = sqlx::query_as(&format!(
            "SELECT {TESTIMONY_COLUMNS} FROM testimonials WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to get testimony: {e}")))?;

        Ok(row.map(Testimony::from))
    }

    pub async fn get(&self, id: i32) -> Result<Testimony> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| LenteraError::NotFound(format!("Testimony {id}")))
    }

    /// Overwrite the text fields and, when `photo` is given, the photo key.
    /// Returns the updated row and the key it replaced.
    pub async fn update(
        &self,
        id: i32,
        draft: &TestimonyDraft,
        photo: Option<&str>,
    ) -> Result<(Testimony, Option<String>)> {
        let previous = self.get(id).await?;

        let row: Option<TestimonyRow> = sqlx::query_as(&format!(
            r#"
            UPDATE testimonials SET
                testimoner_name = $2,
                testimoner_current_position = $3,
                testimoner_previous_position = $4,
                testimony_text = $5,
                testimoner_photo = COALESCE($6, testimoner_photo),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {TESTIMONY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(draft.testimoner_name.trim())
        .bind(draft.testimoner_current_position.trim())
        .bind(draft.testimoner_previous_position.trim())
        .bind(&draft.testimony_text)
        .bind(photo)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to update testimony", e))?;

        let updated = row
            .map(Testimony::from)
            .ok_or_else(|| LenteraError::NotFound(format!("Testimony {id}")))?;

        let replaced = match photo {
            Some(_) => previous.testimoner_photo,
            None => None,
        };
        Ok((updated, replaced))
    }

    pub async fn soft_delete(&self, id: i32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE testimonials SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to delete testimony: {e}")))?;

        ensure_affected(result, "Testimony", id)
    }

    pub async fn restore(&self, id: i32) -> Result<Testimony> {
        let row: Option<TestimonyRow> = sqlx::query_as(&format!(
            r#"
            UPDATE testimonials SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NOT NULL
            RETURNING {TESTIMONY_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to restore testimony: {e}")))?;

        row.map(Testimony::from)
            .ok_or_else(|| LenteraError::NotFound(format!("Deleted testimony {id}")))
    }
}
