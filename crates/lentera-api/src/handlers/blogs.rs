//! Blog handlers
//!
//! Reads are public. Admins and mentors write; the author is always the
//! caller.

use crate::auth::AuthenticatedUser;
use crate::error::{created, done, ok, AppError};
use crate::state::AppState;
use crate::validation::ValidJson;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension,
};
use lentera_core::Blog;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBlogRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateBlogRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/blogs",
    tag = "blogs",
    request_body = CreateBlogRequest,
    responses(
        (status = 201, description = "Blog created", body = Blog),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_blog(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidJson(request): ValidJson<CreateBlogRequest>,
) -> Result<impl IntoResponse, AppError> {
    let blog = state
        .blogs()
        .create(request.title.trim(), &request.content, user.user_id)
        .await?;

    info!(blog_id = blog.id, author_id = user.user_id, "Blog created");
    Ok(created("Blog created successfully", blog))
}

#[utoipa::path(
    get,
    path = "/api/v1/blogs",
    tag = "blogs",
    responses((status = 200, description = "Published blogs", body = Vec<Blog>))
)]
pub async fn list_blogs(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let blogs = state.blogs().list().await?;
    Ok(ok("Successfully retrieved blogs", blogs))
}

#[utoipa::path(
    get,
    path = "/api/v1/blogs/{id}",
    tag = "blogs",
    params(("id" = i32, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Blog", body = Blog),
        (status = 404, description = "Blog not found", body = crate::error::ApiError),
    )
)]
pub async fn get_blog(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let blog = state.blogs().get(id).await?;
    Ok(ok("Successfully retrieved blog", blog))
}

/// Change the title and/or content; omitted fields are kept
#[utoipa::path(
    put,
    path = "/api/v1/blogs/{id}",
    tag = "blogs",
    params(("id" = i32, Path, description = "Blog ID")),
    request_body = UpdateBlogRequest,
    responses(
        (status = 200, description = "Blog updated", body = Blog),
        (status = 404, description = "Blog not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_blog(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    ValidJson(request): ValidJson<UpdateBlogRequest>,
) -> Result<impl IntoResponse, AppError> {
    let blog = state
        .blogs()
        .update(id, request.title.as_deref(), request.content.as_deref())
        .await?;

    Ok(ok("Blog updated successfully", blog))
}

#[utoipa::path(
    delete,
    path = "/api/v1/blogs/{id}",
    tag = "blogs",
    params(("id" = i32, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Blog deleted"),
        (status = 404, description = "Blog not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_blog(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state.blogs().soft_delete(id).await?;
    Ok(done("Blog deleted successfully"))
}

#[utoipa::path(
    patch,
    path = "/api/v1/blogs/{id}/restore",
    tag = "blogs",
    params(("id" = i32, Path, description = "Blog ID")),
    responses(
        (status = 200, description = "Blog restored", body = Blog),
        (status = 404, description = "No deleted blog with this ID", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn restore_blog(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let blog = state.blogs().restore(id).await?;
    Ok(ok("Blog restored successfully", blog))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_title_rejected() {
        let request = CreateBlogRequest {
            title: String::new(),
            content: "body".to_string(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn test_partial_update_accepts_missing_fields() {
        let request = UpdateBlogRequest {
            content: Some("new body".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_ok());
    }
}
