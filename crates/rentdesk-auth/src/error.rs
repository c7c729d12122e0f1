//! Authentication error types.

use rentdesk_core::error::RentdeskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password; never says which.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("no bearer token supplied")]
    MissingToken,

    #[error("no authenticated principal")]
    NotAuthenticated,

    #[error("principal kind not allowed")]
    Forbidden,

    #[error("tenant slug is required for client login")]
    MissingTenantSlug,

    #[error("refresh token is required")]
    MissingRefreshToken,

    #[error("email already registered")]
    EmailExists,

    #[error("slug already taken")]
    SlugExists,

    #[error("agency not found")]
    AgencyNotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error(transparent)]
    Store(#[from] RentdeskError),
}

impl AuthError {
    /// True for `TokenInvalid` and `TokenExpired`, which callers report
    /// identically.
    pub fn is_token_failure(&self) -> bool {
        matches!(self, AuthError::TokenInvalid(_) | AuthError::TokenExpired)
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
