//! Testimony handlers
//!
//! Writes are `multipart/form-data`: the four text fields plus an optional
//! `testimoner_photo` image of up to 1MB.

use crate::error::{created, done, ok, AppError};
use crate::state::AppState;
use crate::storage::{self, MultipartForm, UploadPolicy};
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use lentera_core::{Testimony, TestimonyDraft};
use std::collections::HashMap;
use std::sync::Arc;

const PHOTO_FIELD: &str = "testimoner_photo";

/// Read the required text fields, reporting every missing one
fn draft_from_form(form: &MultipartForm) -> Result<TestimonyDraft, AppError> {
    let mut errors = HashMap::new();
    let mut required = |name: &str| match form.text(name) {
        Some(value) => value.to_string(),
        None => {
            errors.insert(name.to_string(), "This field is required".to_string());
            String::new()
        }
    };

    let draft = TestimonyDraft {
        testimoner_name: required("testimoner_name"),
        testimoner_current_position: required("testimoner_current_position"),
        testimoner_previous_position: required("testimoner_previous_position"),
        testimony_text: required("testimony_text"),
    };

    if errors.is_empty() {
        Ok(draft)
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Upload the photo if one was sent
async fn store_photo(state: &AppState, form: &mut MultipartForm) -> Result<Option<String>, AppError> {
    match form.take_file(PHOTO_FIELD) {
        Some(file) => {
            let key = storage::upload(state.storage.as_ref(), UploadPolicy::TESTIMONER, file).await?;
            Ok(Some(key))
        }
        None => Ok(None),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/testimonies",
    tag = "testimonies",
    request_body(content = String, content_type = "multipart/form-data", description = "testimoner_name, testimoner_current_position, testimoner_previous_position, testimony_text, testimoner_photo (optional)"),
    responses(
        (status = 201, description = "Testimony created", body = Testimony),
        (status = 400, description = "Missing fields or bad image", body = crate::error::ApiError),
        (status = 413, description = "Photo too large", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_testimony(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = MultipartForm::collect(multipart).await?;
    let draft = draft_from_form(&form)?;
    let photo = store_photo(&state, &mut form).await?;

    match state.testimonies().create(&draft, photo.as_deref()).await {
        Ok(testimony) => Ok(created("Testimony created successfully", testimony)),
        Err(e) => {
            if let Some(key) = &photo {
                storage::remove_quietly(state.storage.as_ref(), key).await;
            }
            Err(e.into())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/testimonies",
    tag = "testimonies",
    responses((status = 200, description = "Testimonies", body = Vec<Testimony>))
)]
pub async fn list_testimonies(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let testimonies = state.testimonies().list().await?;
    Ok(ok("Successfully retrieved testimonies", testimonies))
}

#[utoipa::path(
    get,
    path = "/api/v1/testimonies/{id}",
    tag = "testimonies",
    params(("id" = i32, Path, description = "Testimony ID")),
    responses(
        (status = 200, description = "Testimony", body = Testimony),
        (status = 404, description = "Testimony not found", body = crate::error::ApiError),
    )
)]
pub async fn get_testimony(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let testimony = state.testimonies().get(id).await?;
    Ok(ok("Successfully retrieved testimony", testimony))
}

/// Replace the text fields; a new photo replaces and removes the old one
#[utoipa::path(
    put,
    path = "/api/v1/testimonies/{id}",
    tag = "testimonies",
    params(("id" = i32, Path, description = "Testimony ID")),
    request_body(content = String, content_type = "multipart/form-data", description = "Same fields as create"),
    responses(
        (status = 200, description = "Testimony updated", body = Testimony),
        (status = 404, description = "Testimony not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_testimony(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = MultipartForm::collect(multipart).await?;
    let draft = draft_from_form(&form)?;
    let photo = store_photo(&state, &mut form).await?;

    let (testimony, replaced) = match state
        .testimonies()
        .update(id, &draft, photo.as_deref())
        .await
    {
        Ok(result) => result,
        Err(e) => {
            if let Some(key) = &photo {
                storage::remove_quietly(state.storage.as_ref(), key).await;
            }
            return Err(e.into());
        }
    };

    if let Some(old) = replaced {
        storage::remove_quietly(state.storage.as_ref(), &old).await;
    }
    Ok(ok("Testimony updated successfully", testimony))
}

#[utoipa::path(
    delete,
    path = "/api/v1/testimonies/{id}",
    tag = "testimonies",
    params(("id" = i32, Path, description = "Testimony ID")),
    responses(
        (status = 200, description = "Testimony deleted"),
        (status = 404, description = "Testimony not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_testimony(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state.testimonies().soft_delete(id).await?;
    Ok(done("Testimony deleted successfully"))
}

#[utoipa::path(
    patch,
    path = "/api/v1/testimonies/{id}/restore",
    tag = "testimonies",
    params(("id" = i32, Path, description = "Testimony ID")),
    responses(
        (status = 200, description = "Testimony restored", body = Testimony),
        (status = 404, description = "No deleted testimony with this ID", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn restore_testimony(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let testimony = state.testimonies().restore(id).await?;
    Ok(ok("Testimony restored successfully", testimony))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_from_complete_form() {
        let form = MultipartForm::from_parts(
            &[
                ("testimoner_name", "Sari"),
                ("testimoner_current_position", "Engineer"),
                ("testimoner_previous_position", "Student"),
                ("testimony_text", "Great mentors"),
            ],
            vec![],
        );

        let draft = draft_from_form(&form).unwrap();
        assert_eq!(draft.testimoner_name, "Sari");
        assert_eq!(draft.testimony_text, "Great mentors");
    }

    #[test]
    fn test_draft_reports_all_missing_fields() {
        let form = MultipartForm::from_parts(&[("testimoner_name", "Sari")], vec![]);

        let AppError::Validation(errors) = draft_from_form(&form).unwrap_err() else {
            panic!("expected a validation error");
        };
        assert_eq!(errors.len(), 3);
        assert!(errors.contains_key("testimony_text"));
    }
}
