//! Authentication configuration.

use serde::Deserialize;

/// Configuration for the authentication service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for access tokens.
    pub access_token_secret: String,
    /// HMAC secret for refresh tokens. Must differ from the access secret.
    pub refresh_token_secret: String,
    /// Access token lifetime in seconds (default: 604_800 = 7 days).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 2_592_000 = 30 days).
    pub refresh_token_lifetime_secs: u64,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Argon2id iteration count (`t_cost`).
    pub password_work_factor: u32,
    /// Argon2id memory cost in KiB.
    pub password_memory_kib: u32,
    /// Minimum password length for agency registration.
    pub min_agency_password_length: usize,
    /// Minimum password length for client registration and for login.
    pub min_client_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: String::new(),
            refresh_token_secret: String::new(),
            access_token_lifetime_secs: 604_800,
            refresh_token_lifetime_secs: 2_592_000,
            jwt_issuer: "rentdesk".into(),
            // OWASP ASVS: m=19456 (19 MiB), t=2, p=1
            password_work_factor: 2,
            password_memory_kib: 19_456,
            min_agency_password_length: 8,
            min_client_password_length: 6,
        }
    }
}
