//! User management handlers
//!
//! Admins create students and mentors; new accounts are inactive until the
//! owner follows the emailed activation link. Everyone can read and edit
//! their own profile under `/users/me`.

use crate::audit::{audit_log, AuditContext, AuditEvent};
use crate::auth::service::{ActivateAccountRequest, AuthResponse, AuthService, ChangePasswordRequest, TokenRequest};
use crate::auth::AuthenticatedUser;
use crate::error::{created, done, ok, AppError};
use crate::mail::templates;
use crate::state::AppState;
use crate::validation::ValidJson;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Extension,
};
use lentera_core::{
    Enrollment, MentorOption, NewMentor, NewStudent, StudentOption, StudentPlan, User,
    UserChanges, UserStats,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    pub class_id: Uuid,
    /// Number of meeting sessions in the student's plan
    #[validate(range(min = 1, message = "Total sessions must be at least 1"))]
    pub total_sessions: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMentorRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "At least one class is required"))]
    pub class_ids: Vec<Uuid>,
}

/// Self-service profile update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: Option<String>,
}

/// Admin update of any account
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePlanRequest {
    #[validate(range(min = 1, message = "Total sessions must be at least 1"))]
    pub total_sessions: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedStudent {
    pub user: User,
    pub class_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedMentor {
    pub user: User,
    pub class_ids: Vec<Uuid>,
}

/// Send the welcome mail with a fresh activation token
async fn send_activation(state: &AppState, user: &User) -> Result<(), AppError> {
    let token = AuthService::new(state).issue_activation_token(user.id).await?;
    state.send_mail(templates::account_activation(
        &user.email,
        &user.name,
        &state.config.frontend_url,
        &token.token,
    ));
    Ok(())
}

/// Apply `changes` and, when the email moved, ask for it to be verified
async fn update_account(
    state: &AppState,
    user_id: i32,
    changes: UserChanges,
) -> Result<User, AppError> {
    let update = state.users().apply_changes(user_id, changes).await?;

    if update.email_changed {
        let user = &update.user;
        let token = AuthService::new(state)
            .issue_email_verification_token(user.id)
            .await?;
        state.send_mail(templates::email_verification(
            &user.email,
            &user.name,
            &state.config.frontend_url,
            &token.token,
        ));
        info!(user_id = user.id, "Email changed, verification sent");
    }

    Ok(update.user)
}

/// Create a student with class enrollment and session plan
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student registered", body = CreatedStudent),
        (status = 400, description = "Invalid input or unknown class", body = crate::error::ApiError),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_student(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedUser>,
    ValidJson(request): ValidJson<CreateStudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users()
        .create_student(&NewStudent {
            name: request.name.trim().to_string(),
            email: request.email,
            class_id: request.class_id,
            total_sessions: request.total_sessions,
        })
        .await?;

    audit_log(&AuditEvent::UserCreated {
        user_id: user.id,
        role: user.role.to_string(),
        created_by: admin.user_id,
    });
    send_activation(&state, &user).await?;

    Ok(created(
        "Student registered successfully",
        CreatedStudent {
            user,
            class_id: request.class_id,
        },
    ))
}

/// Create a mentor assigned to one or more classes
#[utoipa::path(
    post,
    path = "/api/v1/users/mentors",
    tag = "users",
    request_body = CreateMentorRequest,
    responses(
        (status = 201, description = "Mentor registered", body = CreatedMentor),
        (status = 400, description = "Invalid input or unknown class", body = crate::error::ApiError),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_mentor(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedUser>,
    ValidJson(request): ValidJson<CreateMentorRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut class_ids = request.class_ids;
    class_ids.sort();
    class_ids.dedup();

    let user = state
        .users()
        .create_mentor(&NewMentor {
            name: request.name.trim().to_string(),
            email: request.email,
            class_ids: class_ids.clone(),
        })
        .await?;

    audit_log(&AuditEvent::UserCreated {
        user_id: user.id,
        role: user.role.to_string(),
        created_by: admin.user_id,
    });
    send_activation(&state, &user).await?;

    Ok(created(
        "Mentor registered successfully",
        CreatedMentor { user, class_ids },
    ))
}

/// Activate an account with the emailed token and choose a password
#[utoipa::path(
    post,
    path = "/api/v1/users/activate",
    tag = "users",
    request_body = ActivateAccountRequest,
    responses(
        (status = 200, description = "Account activated and logged in", body = AuthResponse),
        (status = 400, description = "Invalid token or already activated", body = crate::error::ApiError),
        (status = 404, description = "Unknown token", body = crate::error::ApiError),
    )
)]
pub async fn activate_account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidJson(request): ValidJson<ActivateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let response = AuthService::new(&state).activate(&request, &ctx).await?;

    Ok(ok("User activated successfully", response))
}

/// Confirm a changed email address
#[utoipa::path(
    post,
    path = "/api/v1/users/verify-email",
    tag = "users",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Email verified", body = User),
        (status = 400, description = "Invalid, used or expired token", body = crate::error::ApiError),
        (status = 404, description = "Unknown token", body = crate::error::ApiError),
    )
)]
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidJson(request): ValidJson<TokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let user = AuthService::new(&state)
        .verify_email(&request.token, &ctx)
        .await?;

    Ok(ok("Email verified successfully", user))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses((status = 200, description = "All users", body = Vec<User>)),
    security(("bearer_auth" = []))
)]
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let users = state.users().list().await?;
    Ok(ok("Successfully retrieved users", users))
}

/// Account counts per role and activation state
#[utoipa::path(
    get,
    path = "/api/v1/users/stats",
    tag = "users",
    responses((status = 200, description = "User counts", body = UserStats)),
    security(("bearer_auth" = []))
)]
pub async fn user_stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let stats = state.users().stats().await?;
    Ok(ok("Successfully retrieved user count", stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/students/dropdown",
    tag = "users",
    responses((status = 200, description = "Students with their class", body = Vec<StudentOption>)),
    security(("bearer_auth" = []))
)]
pub async fn student_dropdown(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let students = state.users().student_options().await?;
    Ok(ok("Successfully retrieved users for dropdown", students))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/mentors/dropdown",
    tag = "users",
    responses((status = 200, description = "Active mentors", body = Vec<MentorOption>)),
    security(("bearer_auth" = []))
)]
pub async fn mentor_dropdown(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let mentors = state.users().mentor_options().await?;
    Ok(ok("Successfully retrieved mentors for dropdown", mentors))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses((status = 200, description = "Current user", body = User)),
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let me = state.users().get(user.user_id).await?;
    Ok(ok("Successfully retrieved user", me))
}

/// Update own name or email; a new email must be verified again
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    tag = "users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidJson(request): ValidJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let changes = UserChanges {
        name: request.name.map(|n| n.trim().to_string()),
        email: request.email,
        is_active: None,
    };
    let updated = update_account(&state, user.user_id, changes).await?;

    Ok(ok("User updated successfully", updated))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/me/password",
    tag = "users",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Old password incorrect or invalid input", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    ValidJson(request): ValidJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    AuthService::new(&state)
        .change_password(user.user_id, &request, &ctx)
        .await?;

    Ok(done("Password updated successfully"))
}

/// Classes the caller is enrolled in or mentors
#[utoipa::path(
    get,
    path = "/api/v1/users/me/classes",
    tag = "users",
    responses((status = 200, description = "Enrollments", body = Vec<Enrollment>)),
    security(("bearer_auth" = []))
)]
pub async fn my_classes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let classes = state.enrollments().classes_of(user.user_id).await?;
    Ok(ok("Successfully retrieved classes", classes))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.users().get(id).await?;
    Ok(ok("Successfully retrieved user", user))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found", body = crate::error::ApiError),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    ValidJson(request): ValidJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let changes = UserChanges {
        name: request.name.map(|n| n.trim().to_string()),
        email: request.email,
        is_active: request.is_active,
    };
    let updated = update_account(&state, id, changes).await?;

    Ok(ok("User updated successfully", updated))
}

/// Permanently delete an account
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Cannot delete own account", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    if id == admin.user_id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    state.users().delete(id).await?;
    state.sessions.invalidate_session(id).await?;

    audit_log(&AuditEvent::UserDeleted {
        user_id: id,
        deleted_by: admin.user_id,
    });

    Ok(done("User deleted successfully"))
}

/// Activate an account without the email round trip
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}/activate",
    tag = "users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User activated", body = User),
        (status = 400, description = "Already activated", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn force_activate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let users = state.users();
    let user = users.get(id).await?;
    if user.is_active && user.is_verified() {
        return Err(AppError::BadRequest("User already activated".to_string()));
    }

    let user = users.force_activate(id).await?;
    Ok(ok("User activated successfully", user))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/plan",
    tag = "users",
    params(("id" = i32, Path, description = "Student user ID")),
    responses(
        (status = 200, description = "Student plan", body = StudentPlan),
        (status = 404, description = "No plan for this user", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let plan = state
        .enrollments()
        .find_plan(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Student plan not found".to_string()))?;

    Ok(ok("Successfully retrieved student plan", plan))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/plan",
    tag = "users",
    params(("id" = i32, Path, description = "Student user ID")),
    request_body = UpdatePlanRequest,
    responses(
        (status = 200, description = "Student plan updated", body = StudentPlan),
        (status = 404, description = "No plan for this user", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    ValidJson(request): ValidJson<UpdatePlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    let plan = state
        .enrollments()
        .update_plan(id, request.total_sessions)
        .await?;

    Ok(ok("Student plan updated successfully", plan))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_student_validation() {
        let request = CreateStudentRequest {
            name: String::new(),
            email: "student@example.com".to_string(),
            class_id: Uuid::new_v4(),
            total_sessions: 0,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("total_sessions"));
        assert!(!fields.contains_key("email"));
    }

    #[test]
    fn test_mentor_needs_a_class() {
        let request = CreateMentorRequest {
            name: "Budi".to_string(),
            email: "budi@example.com".to_string(),
            class_ids: vec![],
        };
        assert!(request.validate().unwrap_err().field_errors().contains_key("class_ids"));
    }

    #[test]
    fn test_profile_update_fields_are_optional() {
        assert!(UpdateProfileRequest::default().validate().is_ok());

        let bad = UpdateProfileRequest {
            email: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
