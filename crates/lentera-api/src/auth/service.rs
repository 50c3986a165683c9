//! Authentication service layer
//!
//! Login, token refresh and logout, account activation, email verification
//! and the password flows. A user holds at most one session: every login,
//! refresh or activation replaces the stored refresh token.

use super::jwt::{AuthToken, JwtManager, TokenKind, TokenPayload};
use super::one_time_token::{OneTimeToken, OneTimeTokenService, TokenPurpose};
use crate::audit::{audit_log, AuditContext, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use lentera_core::config::AuthConfig;
use lentera_core::db::{SessionRepository, UserStore};
use lentera_core::password::{hash_password, verify_password};
use lentera_core::{User, UserRole};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// First-time activation: consume the emailed token and choose a password
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ActivateAccountRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirmation: String,
}

/// Any request carrying only a one-time token
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EmailRequest {
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

/// Authentication response with tokens
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub token_type: String,
    pub user: User,
}

impl AuthResponse {
    fn new(access: AuthToken, refresh: AuthToken, user: User) -> Self {
        Self {
            access_token: access.token,
            access_token_expires_at: access.expires_at,
            refresh_token: refresh.token,
            refresh_token_expires_at: refresh.expires_at,
            token_type: "Bearer".to_string(),
            user,
        }
    }
}

/// Who an email belongs to, for the pre-login account check
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountStatus {
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub is_verified: bool,
}

/// Authentication service, built per request from the shared state
pub struct AuthService {
    users: UserStore,
    sessions: Arc<dyn SessionRepository>,
    jwt: JwtManager,
    tokens: OneTimeTokenService,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.users(),
            sessions: state.sessions.clone(),
            jwt: state.jwt.clone(),
            tokens: state.tokens.clone(),
            config: state.config.auth.clone(),
        }
    }

    /// Login with email and password
    ///
    /// The account must be active with a verified email.
    pub async fn login(
        &self,
        request: &LoginRequest,
        ctx: &AuditContext,
    ) -> Result<AuthResponse, AppError> {
        let user = self.authenticate(request, ctx).await?;
        self.start_session(user, ctx).await
    }

    /// Login restricted to administrators
    pub async fn admin_login(
        &self,
        request: &LoginRequest,
        ctx: &AuditContext,
    ) -> Result<AuthResponse, AppError> {
        let user = self.authenticate(request, ctx).await?;
        if user.role != UserRole::Admin {
            fail_login(&request.email, "Not an administrator", ctx);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        self.start_session(user, ctx).await
    }

    async fn authenticate(&self, request: &LoginRequest, ctx: &AuditContext) -> Result<User, AppError> {
        let Some(user) = self.users.find_by_email(&request.email).await? else {
            fail_login(&request.email, "Unknown email", ctx);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let password_ok = match &user.password_hash {
            Some(hash) => verify_password(&request.password, hash)?,
            None => false,
        };
        if !password_ok {
            fail_login(&request.email, "Invalid password", ctx);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if !user.is_active {
            fail_login(&request.email, "Account inactive", ctx);
            return Err(AppError::Forbidden("Account is not active".to_string()));
        }
        if !user.is_verified() {
            fail_login(&request.email, "Email not verified", ctx);
            return Err(AppError::Forbidden(
                "Email address has not been verified".to_string(),
            ));
        }

        Ok(user)
    }

    /// Issue a fresh token pair and make its refresh token the only live one
    async fn start_session(&self, user: User, ctx: &AuditContext) -> Result<AuthResponse, AppError> {
        let (access, refresh) = self.issue_pair(&user)?;
        self.sessions.upsert_session(user.id, &refresh.token).await?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role.to_string(),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });

        Ok(AuthResponse::new(access, refresh, user))
    }

    fn issue_pair(&self, user: &User) -> Result<(AuthToken, AuthToken), AppError> {
        let payload = TokenPayload {
            user_id: user.id,
            role: user.role,
        };
        let access = self.jwt.issue(payload, TokenKind::Access)?;
        let refresh = self.jwt.issue(payload, TokenKind::Refresh)?;
        Ok((access, refresh))
    }

    /// Exchange the current refresh token for a new pair
    ///
    /// Only the most recently issued refresh token is accepted.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        ctx: &AuditContext,
    ) -> Result<AuthResponse, AppError> {
        let claims = self.jwt.validate(refresh_token, TokenKind::Refresh)?;
        let user_id = claims.payload.user_id;

        if !self.sessions.session_exists(user_id, refresh_token).await? {
            return Err(AppError::Unauthorized(
                "Refresh token is no longer valid".to_string(),
            ));
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::Unauthorized("Account is not available".to_string()))?;

        let (access, refresh) = self.issue_pair(&user)?;
        self.sessions.upsert_session(user.id, &refresh.token).await?;

        audit_log(&AuditEvent::TokenRefresh {
            user_id,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });

        Ok(AuthResponse::new(access, refresh, user))
    }

    pub async fn logout(&self, user_id: i32, ctx: &AuditContext) -> Result<(), AppError> {
        self.sessions.invalidate_session(user_id).await?;
        audit_log(&AuditEvent::Logout {
            user_id,
            ip_address: ctx.ip_address.clone(),
        });
        Ok(())
    }

    /// Look up the role and state of the account behind an email
    pub async fn account_status(&self, email: &str) -> Result<AccountStatus, AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(AccountStatus {
            is_verified: user.is_verified(),
            email: user.email,
            role: user.role,
            is_active: user.is_active,
        })
    }

    /// Issue the welcome/activation token for a freshly created account
    pub async fn issue_activation_token(&self, user_id: i32) -> Result<OneTimeToken, AppError> {
        Ok(self
            .tokens
            .generate(
                user_id,
                TokenPurpose::AccountActivation,
                Duration::from_secs(self.config.activation_token_ttl_secs),
            )
            .await?)
    }

    /// Issue a token confirming a changed email address
    pub async fn issue_email_verification_token(
        &self,
        user_id: i32,
    ) -> Result<OneTimeToken, AppError> {
        Ok(self
            .tokens
            .generate(
                user_id,
                TokenPurpose::EmailVerification,
                Duration::from_secs(self.config.activation_token_ttl_secs),
            )
            .await?)
    }

    /// Consume an activation token, set the first password and log the user in
    pub async fn activate(
        &self,
        request: &ActivateAccountRequest,
        ctx: &AuditContext,
    ) -> Result<AuthResponse, AppError> {
        let token = self
            .tokens
            .validate(&request.token, TokenPurpose::AccountActivation)
            .await?;

        let user = self.users.get(token.user_id).await?;
        if user.is_verified() {
            return Err(AppError::BadRequest(
                "Account has already been activated".to_string(),
            ));
        }

        let hash = hash_password(&request.password)?;
        let user = self.users.activate(user.id, &hash).await?;

        audit_log(&AuditEvent::AccountActivated {
            user_id: user.id,
            ip_address: ctx.ip_address.clone(),
        });

        let (access, refresh) = self.issue_pair(&user)?;
        self.sessions.upsert_session(user.id, &refresh.token).await?;
        Ok(AuthResponse::new(access, refresh, user))
    }

    pub async fn verify_email(&self, token: &str, ctx: &AuditContext) -> Result<User, AppError> {
        let token = self
            .tokens
            .validate(token, TokenPurpose::EmailVerification)
            .await?;
        let user = self.users.mark_email_verified(token.user_id).await?;

        audit_log(&AuditEvent::EmailVerified {
            user_id: user.id,
            ip_address: ctx.ip_address.clone(),
        });
        Ok(user)
    }

    /// Start a password reset for a verified account
    ///
    /// Returns the account and the issued token; the caller delivers it.
    pub async fn request_password_reset(
        &self,
        email: &str,
        ctx: &AuditContext,
    ) -> Result<(User, OneTimeToken), AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !user.is_verified() {
            return Err(AppError::BadRequest(
                "Email address has not been verified".to_string(),
            ));
        }

        let token = self
            .tokens
            .generate(
                user.id,
                TokenPurpose::PasswordReset,
                Duration::from_secs(self.config.password_reset_token_ttl_secs),
            )
            .await?;

        audit_log(&AuditEvent::PasswordResetRequested {
            user_id: user.id,
            ip_address: ctx.ip_address.clone(),
        });
        Ok((user, token))
    }

    /// Confirm a reset: new password, and any open session is closed
    pub async fn reset_password(
        &self,
        request: &ResetPasswordRequest,
        ctx: &AuditContext,
    ) -> Result<(), AppError> {
        let token = self
            .tokens
            .validate(&request.token, TokenPurpose::PasswordReset)
            .await?;

        let hash = hash_password(&request.password)?;
        self.users.update_password(token.user_id, &hash).await?;
        self.sessions.invalidate_session(token.user_id).await?;

        audit_log(&AuditEvent::PasswordReset {
            user_id: token.user_id,
            ip_address: ctx.ip_address.clone(),
        });
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: i32,
        request: &ChangePasswordRequest,
        ctx: &AuditContext,
    ) -> Result<(), AppError> {
        let user = self.users.get(user_id).await?;

        let old_ok = match &user.password_hash {
            Some(hash) => verify_password(&request.old_password, hash)?,
            None => false,
        };
        if !old_ok {
            return Err(AppError::field("old_password", "Old password is incorrect"));
        }

        let hash = hash_password(&request.new_password)?;
        self.users.update_password(user_id, &hash).await?;

        audit_log(&AuditEvent::PasswordChange {
            user_id,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });
        Ok(())
    }

    /// Peek at a one-time token without consuming it
    pub async fn token_status(&self, token: &str) -> Result<OneTimeToken, AppError> {
        let entry = self
            .tokens
            .check_status(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Token not found".to_string()))?;

        if entry.is_expired_at(Utc::now()) {
            return Err(AppError::BadRequest("Token has expired".to_string()));
        }
        Ok(entry)
    }
}

fn fail_login(email: &str, reason: &str, ctx: &AuditContext) {
    audit_log(&AuditEvent::LoginFailure {
        email: email.to_string(),
        reason: reason.to_string(),
        ip_address: ctx.ip_address.clone(),
        user_agent: ctx.user_agent.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_requires_matching_passwords() {
        let request = ActivateAccountRequest {
            token: "abc".to_string(),
            password: "longenough".to_string(),
            password_confirmation: "different1".to_string(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password_confirmation"));
    }

    #[test]
    fn test_short_password_rejected() {
        let request = ResetPasswordRequest {
            token: "abc".to_string(),
            password: "short".to_string(),
            password_confirmation: "short".to_string(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_login_request_email_format() {
        let request = LoginRequest {
            email: "not-an-email".to_string(),
            password: "secret".to_string(),
        };
        assert!(request.validate().is_err());

        let request = LoginRequest {
            email: "siti@example.com".to_string(),
            password: "secret".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_auth_response_token_type() {
        let now = Utc::now();
        let user = User {
            id: 1,
            name: "Admin".to_string(),
            email: "admin@example.com".to_string(),
            role: UserRole::Admin,
            password_hash: Some("hash".to_string()),
            email_verified_at: Some(now),
            is_active: true,
            created_at: now,
            updated_at: None,
        };
        let token = |t: &str| AuthToken {
            token: t.to_string(),
            expires_at: now,
        };

        let response = AuthResponse::new(token("a"), token("r"), user);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token_type"], "Bearer");
        assert_eq!(json["access_token"], "a");
        assert!(json["user"].get("password_hash").is_none());
    }
}
