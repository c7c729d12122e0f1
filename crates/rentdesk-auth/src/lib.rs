//! Rentdesk Auth: password hashing, access/refresh tokens, role and tenant
//! guards, rate limiting and activity recording.

pub mod activity;
pub mod authz;
pub mod config;
pub mod error;
pub mod password;
pub mod ratelimit;
pub mod service;
pub mod tenant;
pub mod token;

pub use activity::{ActivityRecorder, RecorderStats};
pub use authz::RoleGuard;
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use password::PasswordService;
pub use ratelimit::{InMemoryRateLimitStore, RateLimitConfig, RateLimitStore, RateLimiter};
pub use service::{
    AgencySummary, AuthOutput, AuthService, ClientRegistration, CreateAdminInput, LoginInput,
    RefreshOutput, RegisterAgencyInput, RegisterClientInput, normalize_email,
    validate_email,
};
pub use token::{TokenClaims, TokenKind};
