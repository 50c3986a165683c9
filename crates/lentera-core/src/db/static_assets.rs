//! Static site assets (images referenced by the public pages)

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::ensure_affected;
use crate::models::StaticAsset;
use crate::{LenteraError, Result};

const ASSET_COLUMNS: &str =
    "id, asset_name, asset_type, asset_url, asset_description, created_at, updated_at";

#[derive(Clone)]
pub struct StaticAssetStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct StaticAssetRow {
    id: i32,
    asset_name: String,
    asset_type: String,
    asset_url: String,
    asset_description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<StaticAssetRow> for StaticAsset {
    fn from(row: StaticAssetRow) -> Self {
        StaticAsset {
            id: row.id,
            asset_name: row.asset_name,
            asset_type: row.asset_type,
            asset_url: row.asset_url,
            asset_description: row.asset_description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl StaticAssetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        asset_name: &str,
        asset_type: &str,
        object_key: &str,
        description: Option<&str>,
    ) -> Result<StaticAsset> {
        let row: StaticAssetRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO static_assets (asset_name, asset_type, asset_url, asset_description)
            VALUES ($1, $2, $3, $4)
            RETURNING {ASSET_COLUMNS}
            "#
        ))
        .bind(asset_name.trim())
        .bind(asset_type)
        .bind(object_key)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to create asset", e))?;

        Ok(row.into())
    }

    pub async fn list(&self) -> Result<Vec<StaticAsset>> {
        let rows: Vec<StaticAssetRow> = sqlx::query_as(&format!(
            "SELECT {ASSET_COLUMNS} FROM static_assets WHERE deleted_at IS NULL ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to list assets: {e}")))?;

        Ok(rows.into_iter().map(StaticAsset::from).collect())
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<StaticAsset>> {
        let row: Option<StaticAssetRow> = sqlx::query_as(&format!(
            "SELECT {ASSET_COLUMNS} FROM static_assets WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to get asset: {e}")))?;

        Ok(row.map(StaticAsset::from))
    }

    pub async fn get(&self, id: i32) -> Result<StaticAsset> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| LenteraError::NotFound(format!("Asset {id}")))
    }

    /// Rename or re-describe; the stored object is left alone
    pub async fn update(
        &self,
        id: i32,
        asset_name: Option<&str>,
        description: Option<&str>,
    ) -> Result<StaticAsset> {
        let row: Option<StaticAssetRow> = sqlx::query_as(&format!(
            r#"
            UPDATE static_assets SET
                asset_name = COALESCE($2, asset_name),
                asset_description = COALESCE($3, asset_description),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {ASSET_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(asset_name.map(str::trim))
        .bind(description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::from_sqlx("Failed to update asset", e))?;

        row.map(StaticAsset::from)
            .ok_or_else(|| LenteraError::NotFound(format!("Asset {id}")))
    }

    pub async fn soft_delete(&self, id: i32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE static_assets SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to delete asset: {e}")))?;

        ensure_affected(result, "Asset", id)
    }

    pub async fn restore(&self, id: i32) -> Result<StaticAsset> {
        let row: Option<StaticAssetRow> = sqlx::query_as(&format!(
            r#"
            UPDATE static_assets SET deleted_at = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NOT NULL
            RETURNING {ASSET_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LenteraError::DatabaseError(format!("Failed to restore asset: {e}")))?;

        row.map(StaticAsset::from)
            .ok_or_else(|| LenteraError::NotFound(format!("Deleted asset {id}")))
    }
}
