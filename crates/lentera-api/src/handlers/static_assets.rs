//! Static asset handlers
//!
//! Images used by the public site. Upload is multipart (`asset` file, up to
//! 500KB, with optional `asset_name` and `asset_description` text fields);
//! later edits touch only the name and description.

use crate::error::{created, done, ok, AppError};
use crate::state::AppState;
use crate::storage::{self, MultipartForm, UploadPolicy};
use crate::validation::ValidJson;
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use lentera_core::StaticAsset;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

const ASSET_TYPE: &str = "image";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStaticAssetRequest {
    #[validate(length(min = 1, max = 255, message = "Asset name must be 1-255 characters"))]
    pub asset_name: Option<String>,
    pub asset_description: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/static-assets",
    tag = "static-assets",
    request_body(content = String, content_type = "multipart/form-data", description = "asset, asset_name (optional), asset_description (optional)"),
    responses(
        (status = 201, description = "Asset uploaded", body = StaticAsset),
        (status = 400, description = "Missing or invalid image", body = crate::error::ApiError),
        (status = 413, description = "Image too large", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_static_asset(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = MultipartForm::collect(multipart).await?;
    let file = form.require_file("asset")?;

    let name = form
        .text("asset_name")
        .map(str::to_string)
        .unwrap_or_else(|| file.file_name.clone());
    let description = form.text("asset_description").map(str::to_string);

    let key = storage::upload(state.storage.as_ref(), UploadPolicy::STATIC_ASSET, file).await?;

    match state
        .static_assets()
        .create(&name, ASSET_TYPE, &key, description.as_deref())
        .await
    {
        Ok(asset) => Ok(created("Asset uploaded successfully", asset)),
        Err(e) => {
            storage::remove_quietly(state.storage.as_ref(), &key).await;
            Err(e.into())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/static-assets",
    tag = "static-assets",
    responses((status = 200, description = "Assets", body = Vec<StaticAsset>))
)]
pub async fn list_static_assets(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let assets = state.static_assets().list().await?;
    Ok(ok("Successfully retrieved static assets", assets))
}

#[utoipa::path(
    get,
    path = "/api/v1/static-assets/{id}",
    tag = "static-assets",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset", body = StaticAsset),
        (status = 404, description = "Asset not found", body = crate::error::ApiError),
    )
)]
pub async fn get_static_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let asset = state.static_assets().get(id).await?;
    Ok(ok("Successfully retrieved static asset", asset))
}

#[utoipa::path(
    put,
    path = "/api/v1/static-assets/{id}",
    tag = "static-assets",
    params(("id" = i32, Path, description = "Asset ID")),
    request_body = UpdateStaticAssetRequest,
    responses(
        (status = 200, description = "Asset updated", body = StaticAsset),
        (status = 404, description = "Asset not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_static_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    ValidJson(request): ValidJson<UpdateStaticAssetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let asset = state
        .static_assets()
        .update(
            id,
            request.asset_name.as_deref().map(str::trim),
            request.asset_description.as_deref(),
        )
        .await?;

    Ok(ok("Static asset updated successfully", asset))
}

#[utoipa::path(
    delete,
    path = "/api/v1/static-assets/{id}",
    tag = "static-assets",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset deleted"),
        (status = 404, description = "Asset not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_static_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state.static_assets().soft_delete(id).await?;
    Ok(done("Static asset deleted successfully"))
}

#[utoipa::path(
    patch,
    path = "/api/v1/static-assets/{id}/restore",
    tag = "static-assets",
    params(("id" = i32, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset restored", body = StaticAsset),
        (status = 404, description = "No deleted asset with this ID", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn restore_static_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let asset = state.static_assets().restore(id).await?;
    Ok(ok("Static asset restored successfully", asset))
}
