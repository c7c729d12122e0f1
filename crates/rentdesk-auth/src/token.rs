//! HS256 JWT issuance and verification for access and refresh tokens.
//!
//! The two classes are signed with different secrets and carry a `typ`
//! claim, so a token of one class never verifies as the other.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rentdesk_core::models::principal::{Principal, PrincipalKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn secret<'a>(&self, config: &'a AuthConfig) -> &'a str {
        match self {
            TokenKind::Access => &config.access_token_secret,
            TokenKind::Refresh => &config.refresh_token_secret,
        }
    }

    fn lifetime_secs(&self, config: &AuthConfig) -> i64 {
        match self {
            TokenKind::Access => config.access_token_lifetime_secs as i64,
            TokenKind::Refresh => config.refresh_token_lifetime_secs as i64,
        }
    }
}

/// JWT claims embedded in both token classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: principal ID (UUID string).
    pub sub: String,
    pub email: String,
    pub kind: PrincipalKind,
    /// Tenant ID; absent for platform admins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub typ: TokenKind,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
}

impl TokenClaims {
    /// Rebuild the principal the token was issued for.
    pub fn principal(&self) -> Result<Principal, AuthError> {
        let id = Uuid::parse_str(&self.sub)
            .map_err(|e| AuthError::TokenInvalid(format!("bad subject: {e}")))?;
        let tenant_id = self
            .tenant_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| AuthError::TokenInvalid(format!("bad tenant: {e}")))?;
        Ok(Principal {
            id,
            email: self.email.clone(),
            kind: self.kind,
            tenant_id,
        })
    }
}

pub(crate) fn encode(
    principal: &Principal,
    kind: TokenKind,
    issued_at: i64,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let claims = TokenClaims {
        sub: principal.id.to_string(),
        email: principal.email.clone(),
        kind: principal.kind,
        tenant_id: principal.tenant_id.map(|t| t.to_string()),
        typ: kind,
        iss: config.jwt_issuer.clone(),
        iat: issued_at,
        exp: issued_at + kind.lifetime_secs(config),
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_secret(kind.secret(config).as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Issue a signed access token for `principal`.
pub fn issue_access_token(principal: &Principal, config: &AuthConfig) -> Result<String, AuthError> {
    encode(principal, TokenKind::Access, Utc::now().timestamp(), config)
}

/// Issue a signed refresh token for `principal`.
pub fn issue_refresh_token(
    principal: &Principal,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    encode(principal, TokenKind::Refresh, Utc::now().timestamp(), config)
}

/// Verify signature, issuer, expiry and class of `token`.
///
/// Returns [`AuthError::TokenExpired`] for an expired but otherwise valid
/// token and [`AuthError::TokenInvalid`] for everything else.
pub fn verify_token(
    token: &str,
    kind: TokenKind,
    config: &AuthConfig,
) -> Result<TokenClaims, AuthError> {
    let key = DecodingKey::from_secret(kind.secret(config).as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    let claims = jsonwebtoken::decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })?;

    if claims.typ != kind {
        return Err(AuthError::TokenInvalid("wrong token class".into()));
    }
    Ok(claims)
}
