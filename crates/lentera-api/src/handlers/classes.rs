//! Class handlers

use crate::error::{created, done, ok, AppError};
use crate::state::AppState;
use crate::validation::ValidJson;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use lentera_core::{Class, ClassOption};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ClassRequest {
    #[validate(length(min = 1, max = 100, message = "Class name must be 1-100 characters"))]
    pub classname: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/classes",
    tag = "classes",
    request_body = ClassRequest,
    responses(
        (status = 201, description = "Class created", body = Class),
        (status = 409, description = "Class name already used", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_class(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<ClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    let class = state.classes().create(&request.classname).await?;
    Ok(created("Class created successfully", class))
}

#[utoipa::path(
    get,
    path = "/api/v1/classes",
    tag = "classes",
    responses((status = 200, description = "All classes", body = Vec<Class>)),
    security(("bearer_auth" = []))
)]
pub async fn list_classes(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let classes = state.classes().list().await?;
    Ok(ok("Successfully retrieved classes", classes))
}

#[utoipa::path(
    get,
    path = "/api/v1/classes/dropdown",
    tag = "classes",
    responses((status = 200, description = "Class options", body = Vec<ClassOption>)),
    security(("bearer_auth" = []))
)]
pub async fn class_dropdown(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let options = state.classes().dropdown().await?;
    Ok(ok("Successfully retrieved classes for dropdown", options))
}

#[utoipa::path(
    get,
    path = "/api/v1/classes/{id}",
    tag = "classes",
    params(("id" = Uuid, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class", body = Class),
        (status = 404, description = "Class not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_class(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let class = state
        .classes()
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Class not found".to_string()))?;

    Ok(ok("Successfully retrieved class", class))
}

#[utoipa::path(
    put,
    path = "/api/v1/classes/{id}",
    tag = "classes",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = ClassRequest,
    responses(
        (status = 200, description = "Class updated", body = Class),
        (status = 404, description = "Class not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_class(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidJson(request): ValidJson<ClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    let class = state.classes().update(id, &request.classname).await?;
    Ok(ok("Class updated successfully", class))
}

#[utoipa::path(
    delete,
    path = "/api/v1/classes/{id}",
    tag = "classes",
    params(("id" = Uuid, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class deleted"),
        (status = 404, description = "Class not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_class(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.classes().soft_delete(id).await?;
    Ok(done("Class deleted successfully"))
}

#[utoipa::path(
    patch,
    path = "/api/v1/classes/{id}/restore",
    tag = "classes",
    params(("id" = Uuid, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class restored", body = Class),
        (status = 404, description = "No deleted class with this ID", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn restore_class(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let class = state.classes().restore(id).await?;
    Ok(ok("Class restored successfully", class))
}
