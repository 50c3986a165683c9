//! Security audit logging
//!
//! Authentication and account events are logged at INFO level under the
//! `audit` target, so they can be filtered (`RUST_LOG=audit=info`) and
//! shipped separately from application logs. Each record carries the event
//! serialized as JSON next to a few flat fields for quick grepping:
//!
//! ```json
//! {
//!   "event_type": "login_success",
//!   "user_id": 12,
//!   "email": "mentor@example.com",
//!   "role": "mentor",
//!   "ip_address": "203.0.113.1",
//!   "user_agent": "Mozilla/5.0"
//! }
//! ```

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Security-relevant events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    LoginSuccess {
        user_id: i32,
        email: String,
        role: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    Logout {
        user_id: i32,
        ip_address: Option<String>,
    },

    TokenRefresh {
        user_id: i32,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Bad, expired or revoked bearer token
    InvalidToken {
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    AccessDenied {
        user_id: Option<i32>,
        role: Option<String>,
        resource: String,
        allowed_roles: String,
        ip_address: Option<String>,
    },

    AccountActivated {
        user_id: i32,
        ip_address: Option<String>,
    },

    EmailVerified {
        user_id: i32,
        ip_address: Option<String>,
    },

    PasswordChange {
        user_id: i32,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    PasswordResetRequested {
        user_id: i32,
        ip_address: Option<String>,
    },

    PasswordReset {
        user_id: i32,
        ip_address: Option<String>,
    },

    UserCreated {
        user_id: i32,
        role: String,
        created_by: i32,
    },

    UserDeleted {
        user_id: i32,
        deleted_by: i32,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::TokenRefresh { .. } => "Token refresh",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::AccountActivated { .. } => "Account activated",
            AuditEvent::EmailVerified { .. } => "Email verified",
            AuditEvent::PasswordChange { .. } => "Password changed",
            AuditEvent::PasswordResetRequested { .. } => "Password reset requested",
            AuditEvent::PasswordReset { .. } => "Password reset",
            AuditEvent::UserCreated { .. } => "User created",
            AuditEvent::UserDeleted { .. } => "User deleted",
        }
    }

    fn subject(&self) -> Option<i32> {
        match self {
            AuditEvent::LoginSuccess { user_id, .. }
            | AuditEvent::Logout { user_id, .. }
            | AuditEvent::TokenRefresh { user_id, .. }
            | AuditEvent::AccountActivated { user_id, .. }
            | AuditEvent::EmailVerified { user_id, .. }
            | AuditEvent::PasswordChange { user_id, .. }
            | AuditEvent::PasswordResetRequested { user_id, .. }
            | AuditEvent::PasswordReset { user_id, .. }
            | AuditEvent::UserCreated { user_id, .. }
            | AuditEvent::UserDeleted { user_id, .. } => Some(*user_id),
            AuditEvent::AccessDenied { user_id, .. } => *user_id,
            AuditEvent::LoginFailure { .. } | AuditEvent::InvalidToken { .. } => None,
        }
    }
}

/// Client metadata attached to audit records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Emit an audit record
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        event = %event_json,
        user_id = ?event.subject(),
        "{}",
        event.summary()
    );
}

/// Client IP from proxy headers (`X-Forwarded-For`, then `X-Real-IP`)
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(first) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        let ip = first.trim();
        if !ip.is_empty() {
            return Some(ip.to_string());
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
