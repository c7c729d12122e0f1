//! Role guard: restricts an operation to an allow-list of principal kinds.

use rentdesk_core::models::principal::{Principal, PrincipalKind};

use crate::error::AuthError;

#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Vec<PrincipalKind>,
}

impl RoleGuard {
    pub fn new(allowed: &[PrincipalKind]) -> Self {
        Self {
            allowed: allowed.to_vec(),
        }
    }

    pub fn platform_admin_only() -> Self {
        Self::new(&[PrincipalKind::PlatformAdmin])
    }

    pub fn agency_only() -> Self {
        Self::new(&[PrincipalKind::Agency])
    }

    pub fn allowed(&self) -> &[PrincipalKind] {
        &self.allowed
    }

    /// `NotAuthenticated` when no principal is attached, `Forbidden` when
    /// its kind is not allowed.
    pub fn check(&self, principal: Option<&Principal>) -> Result<(), AuthError> {
        let principal = principal.ok_or(AuthError::NotAuthenticated)?;
        if self.allowed.contains(&principal.kind) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}
