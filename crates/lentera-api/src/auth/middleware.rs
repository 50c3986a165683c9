//! Authentication and role middleware
//!
//! `auth_middleware` turns a bearer access token into an
//! [`AuthenticatedUser`] in the request extensions. The token must verify
//! and the user must still have a live session, so logging out cuts off every
//! access token issued before it. `require_roles` then gates a route group
//! on an explicit role allow-list.

use super::jwt::{JwtError, TokenKind};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::{ApiResponse, ResponseStatus};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use lentera_core::UserRole;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Identity of the caller, available to handlers as
/// `Extension<AuthenticatedUser>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }
}

/// Authentication middleware errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    #[error("Session has ended")]
    SessionNotFound,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Session lookup failed: {0}")]
    SessionLookup(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::MissingAuthHeader => {
                (StatusCode::UNAUTHORIZED, "Missing Authorization header")
            }
            AuthError::InvalidAuthHeader => (
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header format",
            ),
            AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::SessionNotFound => (
                StatusCode::UNAUTHORIZED,
                "Session has ended, please log in again",
            ),
            AuthError::InsufficientPermissions => {
                (StatusCode::FORBIDDEN, "Insufficient permissions")
            }
            AuthError::SessionLookup(e) => {
                warn!(error = %e, "Session lookup failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body: ApiResponse<()> = ApiResponse {
            status: ResponseStatus::for_code(status),
            message: if status.is_server_error() {
                message.to_string()
            } else {
                status.canonical_reason().unwrap_or("Error").to_string()
            },
            data: None,
            error: (!status.is_server_error()).then(|| message.to_string()),
            errors: None,
        };

        (status, Json(body)).into_response()
    }
}

fn bearer_token(request: &Request<Body>) -> Result<&str, AuthError> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}

/// Authentication middleware that requires a valid access token and a live
/// session
///
/// ```ignore
/// let protected = Router::new()
///     .route("/users/me", get(users::me))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(&request)?;

    let claims = match state.jwt.validate(token, TokenKind::Access) {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                reason: e.to_string(),
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
            });
            return Err(AuthError::InvalidToken(e));
        }
    };

    let user_id = claims.payload.user_id;
    let session = state
        .sessions
        .get_session(user_id)
        .await
        .map_err(|e| AuthError::SessionLookup(e.to_string()))?;
    if session.is_none() {
        audit_log(&AuditEvent::InvalidToken {
            reason: format!("No active session for user {user_id}"),
            ip_address: extract_ip_address(request.headers()),
            user_agent: extract_user_agent(request.headers()),
        });
        return Err(AuthError::SessionNotFound);
    }

    request.extensions_mut().insert(AuthenticatedUser {
        user_id,
        role: claims.payload.role,
    });

    Ok(next.run(request).await)
}

/// Type alias for role middleware future
type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// Middleware factory admitting only the listed roles
///
/// Admins get no implicit pass; list them where they belong. Must run
/// inside `auth_middleware`.
///
/// ```ignore
/// let admin_only = Router::new()
///     .route("/users", get(users::list))
///     .route_layer(middleware::from_fn(require_roles(&[UserRole::Admin])));
/// ```
pub fn require_roles(
    allowed: &'static [UserRole],
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let user = request
                .extensions()
                .get::<AuthenticatedUser>()
                .copied()
                .ok_or(AuthError::MissingAuthHeader)?;

            if !user.has_any_role(allowed) {
                audit_log(&AuditEvent::AccessDenied {
                    user_id: Some(user.user_id),
                    role: Some(user.role.to_string()),
                    resource: request.uri().path().to_string(),
                    allowed_roles: allowed
                        .iter()
                        .map(UserRole::as_str)
                        .collect::<Vec<_>>()
                        .join(","),
                    ip_address: extract_ip_address(request.headers()),
                });

                return Err(AuthError::InsufficientPermissions);
            }

            Ok(next.run(request).await)
        })
    }
}
