//! JWT token generation and validation
//!
//! Implements JWT-based session tokens with HMAC-SHA256 signing. Claims carry
//! one typed payload (`user_id`, `role`) plus the token kind, so a refresh
//! token can never be presented where an access token is expected.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lentera_core::config::AuthConfig;
use lentera_core::UserRole;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identity embedded in every session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    pub user_id: i32,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub payload: TokenPayload,
    pub kind: TokenKind,
    /// JWT ID, unique per minted token
    pub jti: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

/// A signed token and the moment it stops being valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Unexpected token kind")]
    WrongKind,
}

/// Signs and verifies session tokens with one shared secret
#[derive(Clone)]
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "iat"]);
        // expiry is exact; no clock-skew grace
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl: Duration::seconds(access_ttl_secs as i64),
            refresh_ttl: Duration::seconds(refresh_ttl_secs as i64),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config.access_token_ttl_secs,
            config.refresh_token_ttl_secs,
        )
    }

    /// Mint a token that expires at `expires_at`
    pub fn generate(
        &self,
        payload: TokenPayload,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> Result<AuthToken, JwtError> {
        let claims = Claims {
            payload,
            kind,
            jti: Uuid::new_v4().to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;

        // second precision, as stored in the claims
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at);

        Ok(AuthToken { token, expires_at })
    }

    /// Mint a token with the configured lifetime for `kind`
    pub fn issue(&self, payload: TokenPayload, kind: TokenKind) -> Result<AuthToken, JwtError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        self.generate(payload, kind, Utc::now() + ttl)
    }

    /// Verify signature, expiry and shape, and require the expected kind
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken,
            }
        })?;

        if data.claims.kind != expected {
            return Err(JwtError::WrongKind);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new("test-secret", 3600, 7200)
    }

    fn payload() -> TokenPayload {
        TokenPayload {
            user_id: 42,
            role: UserRole::Mentor,
        }
    }

    #[test]
    fn test_generate_and_validate_token() {
        let jwt = manager();
        let token = jwt.issue(payload(), TokenKind::Access).unwrap();

        let claims = jwt.validate(&token.token, TokenKind::Access).unwrap();
        assert_eq!(claims.payload, payload());
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp, token.expires_at.timestamp());
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let jwt = manager();
        let refresh = jwt.issue(payload(), TokenKind::Refresh).unwrap();

        assert!(matches!(
            jwt.validate(&refresh.token, TokenKind::Access),
            Err(JwtError::WrongKind)
        ));
        assert!(jwt.validate(&refresh.token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_invalid_token() {
        let result = manager().validate("invalid.token.here", TokenKind::Access);
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let token = JwtManager::new("secret1", 60, 60)
            .issue(payload(), TokenKind::Access)
            .unwrap();

        let result = JwtManager::new("secret2", 60, 60).validate(&token.token, TokenKind::Access);
        assert!(matches!(result, Err(JwtError::InvalidSignature)));
    }

    #[test]
    fn test_expired_token() {
        let jwt = manager();
        let token = jwt
            .generate(payload(), TokenKind::Access, Utc::now() - Duration::hours(1))
            .unwrap();

        let result = jwt.validate(&token.token, TokenKind::Access);
        assert!(matches!(result, Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_just_expired_token_rejected() {
        let jwt = manager();
        let token = jwt
            .generate(payload(), TokenKind::Access, Utc::now() - Duration::seconds(5))
            .unwrap();

        let result = jwt.validate(&token.token, TokenKind::Access);
        assert!(matches!(result, Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_back_to_back_tokens_are_distinct() {
        let jwt = manager();
        let first = jwt.issue(payload(), TokenKind::Refresh).unwrap();
        let second = jwt.issue(payload(), TokenKind::Refresh).unwrap();

        assert_ne!(first.token, second.token);
        let first_id = jwt.validate(&first.token, TokenKind::Refresh).unwrap().jti;
        let second_id = jwt.validate(&second.token, TokenKind::Refresh).unwrap().jti;
        assert_ne!(first_id, second_id);
    }

    #[test]
    fn test_foreign_payload_shape_rejected() {
        #[derive(Serialize)]
        struct Foreign {
            sub: String,
            exp: i64,
            iat: i64,
        }

        let now = Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Foreign {
                sub: "42".to_string(),
                exp: now + 600,
                iat: now,
            },
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            manager().validate(&token, TokenKind::Access),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_unexpected_algorithm_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            payload: payload(),
            kind: TokenKind::Access,
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(manager().validate(&token, TokenKind::Access).is_err());
    }
}
