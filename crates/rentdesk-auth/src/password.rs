//! Password hashing and verification using Argon2id.
//!
//! Digests are PHC strings, so the parameters a hash was made with travel
//! with it and verification keeps working after the work factor changes.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use tracing::warn;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};

/// Salted, adaptive one-way hashing with a configurable work factor.
#[derive(Debug, Clone)]
pub struct PasswordService {
    params: Params,
}

impl PasswordService {
    /// Build from explicit Argon2id costs (`t_cost` iterations, `m_cost`
    /// KiB, single lane).
    pub fn new(work_factor: u32, memory_kib: u32) -> AuthResult<Self> {
        let params = Params::new(memory_kib, work_factor, 1, None)
            .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
        Ok(Self { params })
    }

    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        Self::new(config.password_work_factor, config.password_memory_kib)
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash `plaintext` with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))?;
        Ok(hash.to_string())
    }

    /// Check `plaintext` against a stored digest.
    ///
    /// Fails closed: a malformed digest is logged and reported as a
    /// mismatch.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let parsed = match argon2::PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Stored password digest is malformed");
                return false;
            }
        };

        match self.hasher().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => true,
            Err(argon2::password_hash::Error::Password) => false,
            Err(e) => {
                warn!(error = %e, "Password verification failed");
                false
            }
        }
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_async(&self, plaintext: String) -> AuthResult<String> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash(&plaintext))
            .await
            .map_err(|e| AuthError::Crypto(format!("hashing task failed: {e}")))?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_async(&self, plaintext: String, digest: String) -> bool {
        let service = self.clone();
        match tokio::task::spawn_blocking(move || service.verify(&plaintext, &digest)).await {
            Ok(matched) => matched,
            Err(e) => {
                warn!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheapest valid parameters so the suite stays fast.
    fn service() -> PasswordService {
        PasswordService::new(1, 8).unwrap()
    }

    #[test]
    fn same_password_hashes_differently() {
        let svc = service();
        let a = svc.hash("hunter22").unwrap();
        let b = svc.hash("hunter22").unwrap();

        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(svc.verify("hunter22", &a));
        assert!(svc.verify("hunter22", &b));
    }

    #[test]
    fn wrong_password_does_not_match() {
        let svc = service();
        let hash = svc.hash("hunter22").unwrap();
        assert!(!svc.verify("hunter23", &hash));
    }

    #[test]
    fn malformed_digest_fails_closed() {
        assert!(!service().verify("pw", "not-a-hash"));
        assert!(!service().verify("pw", ""));
    }

    #[test]
    fn digest_from_other_work_factor_still_verifies() {
        let old = PasswordService::new(2, 16).unwrap();
        let hash = old.hash("s3cret!!").unwrap();
        assert!(service().verify("s3cret!!", &hash));
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert!(PasswordService::new(0, 8).is_err());
    }

    #[tokio::test]
    async fn async_variants_match_sync() {
        let svc = service();
        let hash = svc.hash_async("longenough".into()).await.unwrap();
        assert!(svc.verify_async("longenough".into(), hash.clone()).await);
        assert!(!svc.verify_async("nope".into(), hash).await);
    }
}
