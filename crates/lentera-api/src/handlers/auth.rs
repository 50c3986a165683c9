//! Authentication API handlers
//!
//! Login, token refresh and logout, the pre-login account check, token
//! peeking and the password reset flow.

use crate::audit::AuditContext;
use crate::auth::service::{
    AccountStatus, AuthResponse, AuthService, EmailRequest, LoginRequest, RefreshRequest,
    ResetPasswordRequest, TokenRequest,
};
use crate::auth::{AuthenticatedUser, TokenPurpose};
use crate::error::{done, ok, AppError};
use crate::mail::templates;
use crate::state::AppState;
use crate::validation::ValidJson;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// What a one-time token is good for, without consuming it
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenStatus {
    pub purpose: TokenPurpose,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

/// Login with email and password
///
/// The account must be active and its email verified. Logging in replaces
/// any earlier session of the same user.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 403, description = "Account inactive or email not verified", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let response = AuthService::new(&state).login(&request, &ctx).await?;

    Ok(ok("Login successful", response))
}

/// Login to the admin dashboard; non-admin accounts are rejected
#[utoipa::path(
    post,
    path = "/api/v1/auth/admin/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials or not an admin", body = crate::error::ApiError),
        (status = 403, description = "Account inactive or email not verified", body = crate::error::ApiError),
    )
)]
pub async fn admin_login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let response = AuthService::new(&state).admin_login(&request, &ctx).await?;

    Ok(ok("Login successful", response))
}

/// Refresh access token
///
/// Only the most recently issued refresh token is accepted; a new pair is
/// returned and the presented token stops working.
#[utoipa::path(
    put,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = AuthResponse),
        (status = 401, description = "Invalid or superseded refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidJson(request): ValidJson<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let response = AuthService::new(&state)
        .refresh(&request.refresh_token, &ctx)
        .await?;

    Ok(ok("Successfully refreshed token", response))
}

/// Logout
///
/// Ends the session, which also invalidates every access token issued
/// before it.
#[utoipa::path(
    delete,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    AuthService::new(&state).logout(user.user_id, &ctx).await?;

    Ok(done("Successfully logged out"))
}

/// Look up the role and activation state behind an email
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-account",
    tag = "auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Account found", body = AccountStatus),
        (status = 404, description = "No account with this email", body = crate::error::ApiError),
    )
)]
pub async fn verify_account_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = AuthService::new(&state)
        .account_status(&request.email)
        .await?;

    Ok(ok("Account verification successful", status))
}

/// Check a one-time token without consuming it
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-token",
    tag = "auth",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token is valid", body = TokenStatus),
        (status = 400, description = "Token has expired", body = crate::error::ApiError),
        (status = 404, description = "Unknown token", body = crate::error::ApiError),
    )
)]
pub async fn verify_token_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<TokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = AuthService::new(&state).token_status(&request.token).await?;

    Ok(ok(
        "Token is valid",
        TokenStatus {
            purpose: token.purpose,
            expires_at: token.expires_at,
            used: token.used,
        },
    ))
}

/// Request a password reset email
///
/// Only verified accounts can reset; the link is valid for 15 minutes.
#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset",
    tag = "auth",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Reset email queued"),
        (status = 400, description = "Email not verified", body = crate::error::ApiError),
        (status = 404, description = "No account with this email", body = crate::error::ApiError),
    )
)]
pub async fn request_password_reset_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidJson(request): ValidJson<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let (user, token) = AuthService::new(&state)
        .request_password_reset(&request.email, &ctx)
        .await?;

    state.send_mail(templates::password_reset(
        &user.email,
        &user.name,
        &state.config.frontend_url,
        &token.token,
    ));

    Ok(done("Password reset email sent successfully"))
}

/// Set a new password with a reset token
#[utoipa::path(
    put,
    path = "/api/v1/auth/password-reset",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Invalid, used or expired token", body = crate::error::ApiError),
        (status = 404, description = "Unknown token", body = crate::error::ApiError),
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidJson(request): ValidJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    AuthService::new(&state).reset_password(&request, &ctx).await?;

    Ok(done("Password updated successfully"))
}
