//! Blog posts

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::ensure_affected;
use crate::models::{Blog, UserSummary};
use crate::{LenteraError, Result};

const SELECT_BLOG: &str = r#"
    SELECT b.id, b.title, b.content, b.created_at, b.updated_at,
           u.id AS author_id, u.name AS author_name, u.email AS author_email
    FROM blogs b
    JOIN users u ON u.id = b.author_id
"#;

#[derive(Clone)]
pub struct BlogStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct BlogRow {
    id: i32,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    author_id: i32,
    author_name: String,
    author_email: String,
}

impl From<BlogRow> for Blog {
    fn from(row: BlogRow) -> Self {
        Blog {
            id: row.id,
            title: row.title,
            content: row.content,
            author: UserSummary {
                id: row.author_id,
                name: row.author_name,
                email: row.author_email,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl BlogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, title: &str, content: &str, author_id: i32) -> Result<Blog> {
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO blogs (title, content, author_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(title.trim())
        .bind(content)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to create blog", e))?;

        self.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<Blog>> {
        let rows: Vec<BlogRow> = sqlx::query_as(&format!(
            "{SELECT_BLOG} WHERE b.deleted_at IS NULL ORDER BY b.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to list blogs: {e}")))?;

        Ok(rows.into_iter().map(Blog::from).collect())
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Blog>> {
        let row: Option<BlogRow> =
            sqlx::query_as(&format!("{SELECT_BLOG} WHERE b.id = $1 AND b.deleted_at IS NULL"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| LenteraError::DatabaseError(format!("Failed to get blog: {e}")))?;

        Ok(row.map(Blog::from))
    }

    pub async fn get(&self, id: i32) -> Result<Blog> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| LenteraError::NotFound(format!("Blog {id}")))
    }

    /// Replace title and/or content; `None` keeps the stored value
    pub async fn update(
        &self,
        id: i32,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Blog> {
        let result = sqlx::query(
            r#"
            UPDATE blogs SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(title.map(str::trim))
        .bind(content)
        .execute(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to update blog", e))?;

        ensure_affected(result, "Blog", id)?;
        self.get(id).await
    }

    pub async fn soft_delete(&self, id: i32) -> Result<()> {
        let result =
            sqlx::query("UPDATE blogs SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| LenteraError::DatabaseError(format!("Failed to delete blog: {e}")))?;

        ensure_affected(result, "Blog", id)
    }

    pub async fn restore(&self, id: i32) -> Result<Blog> {
        let result = sqlx::query(
            "UPDATE blogs SET deleted_at = NULL, updated_at = NOW() WHERE id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to restore blog: {e}")))?;

        ensure_affected(result, "Deleted blog", id)?;
        self.get(id).await
    }
}
