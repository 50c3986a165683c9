//! API error handling and the JSON response envelope
//!
//! Every response body has the shape
//! `{ status, message, data?, error?, errors? }` where `status` is
//! `success` (2xx), `fail` (4xx) or `error` (5xx).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::error;
use utoipa::ToSchema;

use crate::auth::jwt::JwtError;
use crate::auth::one_time_token::OneTimeTokenError;
use crate::cache::CacheError;
use crate::storage::StorageError;
use lentera_core::password::PasswordError;
use lentera_core::{AttendanceError, LenteraError};

/// Envelope status field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Fail,
    Error,
}

impl ResponseStatus {
    pub fn for_code(code: StatusCode) -> Self {
        if code.is_server_error() {
            ResponseStatus::Error
        } else if code.is_client_error() {
            ResponseStatus::Fail
        } else {
            ResponseStatus::Success
        }
    }
}

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, String>>,
}

/// Body of a failed request, as documented in the OpenAPI schema
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub status: ResponseStatus,
    pub message: String,
    pub error: Option<String>,
    /// Field name to message, present on validation failures
    pub errors: Option<HashMap<String, String>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data: Some(data),
            error: None,
            errors: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data: None,
            error: None,
            errors: None,
        }
    }

    fn failure(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::for_code(code),
            message: message.into(),
            data: None,
            error: None,
            errors: None,
        }
    }
}

/// `200 OK` with data
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(message, data))).into_response()
}

/// `201 Created` with data
pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(message, data))).into_response()
}

/// `200 OK` with only a message
pub fn done(message: impl Into<String>) -> Response {
    (StatusCode::OK, Json(ApiResponse::message(message))).into_response()
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Field-level validation failures
    Validation(HashMap<String, String>),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    PayloadTooLarge(String),
    Internal(String),
    Database(String),
}

impl AppError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(HashMap::from([(field.to_string(), message.into())]))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(errors) => write!(f, "validation failed on {} field(s)", errors.len()),
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::Internal(msg)
            | AppError::Database(msg) => f.write_str(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let body = match self {
            AppError::Validation(errors) => ApiResponse {
                errors: Some(errors),
                ..ApiResponse::failure(code, "Validation failed")
            },
            AppError::BadRequest(msg) => ApiResponse {
                error: Some(msg),
                ..ApiResponse::failure(code, "Bad request")
            },
            AppError::Unauthorized(msg) => ApiResponse {
                error: Some(msg),
                ..ApiResponse::failure(code, "Unauthorized")
            },
            AppError::Forbidden(msg) => ApiResponse {
                error: Some(msg),
                ..ApiResponse::failure(code, "Forbidden")
            },
            AppError::NotFound(msg) => ApiResponse {
                error: Some(msg),
                ..ApiResponse::failure(code, "Resource not found")
            },
            AppError::Conflict(msg) => ApiResponse {
                error: Some(msg),
                ..ApiResponse::failure(code, "Conflict")
            },
            AppError::PayloadTooLarge(msg) => ApiResponse {
                error: Some(msg),
                ..ApiResponse::failure(code, "Payload too large")
            },
            AppError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                ApiResponse::failure(code, "Internal server error")
            }
            AppError::Database(msg) => {
                error!(error = %msg, "Database error");
                ApiResponse::failure(code, "Internal server error")
            }
        };

        (code, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<LenteraError> for AppError {
    fn from(err: LenteraError) -> Self {
        match err {
            LenteraError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            LenteraError::Conflict(msg) => AppError::Conflict(msg),
            LenteraError::ValidationError(msg) => AppError::BadRequest(msg),
            LenteraError::DatabaseError(msg) => AppError::Database(msg),
            LenteraError::CacheError(msg) => AppError::Internal(format!("Cache error: {msg}")),
            LenteraError::StorageError(msg) => AppError::Internal(format!("Storage error: {msg}")),
            LenteraError::ConfigError(msg) => {
                AppError::Internal(format!("Configuration error: {msg}"))
            }
            LenteraError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<JwtError> for AppError {
    fn from(_: JwtError) -> Self {
        AppError::Unauthorized("Invalid or expired token".to_string())
    }
}

impl From<OneTimeTokenError> for AppError {
    fn from(err: OneTimeTokenError) -> Self {
        match err {
            OneTimeTokenError::NotFound => AppError::NotFound(err.to_string()),
            OneTimeTokenError::AlreadyUsed
            | OneTimeTokenError::PurposeMismatch
            | OneTimeTokenError::Expired => AppError::BadRequest(err.to_string()),
            OneTimeTokenError::Cache(e) => AppError::Internal(e.to_string()),
            OneTimeTokenError::Corrupted(msg) => AppError::Internal(msg),
        }
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            StorageError::InvalidExtension(_) | StorageError::MissingFile(_) => {
                AppError::BadRequest(err.to_string())
            }
            StorageError::Multipart(msg) => AppError::BadRequest(msg),
            StorageError::Backend(msg) => AppError::Internal(format!("Storage error: {msg}")),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<AttendanceError> for AppError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::NotParticipant => AppError::Forbidden(err.to_string()),
            AttendanceError::NotScheduled
            | AttendanceError::AlreadyPassed
            | AttendanceError::AlreadyRecorded => AppError::Conflict(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields() {
        let response = AppError::field("email", "must be a valid email").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["status"], "fail");
        assert_eq!(json["errors"]["email"], "must be a valid email");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Database("password authentication failed".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert!(json.get("error").is_none());
        assert!(!json.to_string().contains("password authentication"));
    }

    #[test]
    fn test_core_error_mapping() {
        let err: AppError = LenteraError::Conflict("email taken".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err: AppError = LenteraError::NotFound("Class 1".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_attendance_error_mapping() {
        let err: AppError = AttendanceError::NotParticipant.into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err: AppError = AttendanceError::AlreadyRecorded.into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_status_for_code() {
        assert_eq!(ResponseStatus::for_code(StatusCode::CREATED), ResponseStatus::Success);
        assert_eq!(ResponseStatus::for_code(StatusCode::NOT_FOUND), ResponseStatus::Fail);
        assert_eq!(
            ResponseStatus::for_code(StatusCode::BAD_GATEWAY),
            ResponseStatus::Error
        );
    }
}
