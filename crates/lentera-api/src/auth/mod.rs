//! Authentication and authorization
//!
//! - `jwt`: signed access/refresh tokens
//! - `one_time_token`: cache-backed activation, verification and reset tokens
//! - `middleware`: bearer authentication and role gates
//! - `service`: login and account flows

pub mod jwt;
pub mod middleware;
pub mod one_time_token;
pub mod service;

pub use jwt::{AuthToken, Claims, JwtError, JwtManager, TokenKind, TokenPayload};
pub use middleware::{auth_middleware, require_roles, AuthError, AuthenticatedUser};
pub use one_time_token::{OneTimeToken, OneTimeTokenError, OneTimeTokenService, TokenPurpose};
pub use service::{AuthResponse, AuthService};
