//! Tenant isolation: confine agency and client requests to their own
//! tenant.
//!
//! The tenant-scoping field is always overwritten with the principal's own
//! tenant id, on read filters and on write bodies alike. A differing
//! caller-supplied value is logged but never rejected or merged. Platform
//! admins pass through untouched.

use rentdesk_core::models::principal::{Principal, PrincipalKind};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::AuthError;

/// Name of the tenant-scoping field in query strings and JSON bodies.
pub const TENANT_FIELD: &str = "agency_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// Every tenant is visible.
    Unrestricted,
    /// Confined to one agency.
    Tenant(Uuid),
}

/// Resolve the scope a principal may act in.
pub fn scope_for(principal: &Principal) -> Result<TenantScope, AuthError> {
    match principal.kind {
        PrincipalKind::PlatformAdmin => Ok(TenantScope::Unrestricted),
        PrincipalKind::Agency => Ok(TenantScope::Tenant(
            principal.tenant_id.unwrap_or(principal.id),
        )),
        PrincipalKind::Client => principal
            .tenant_id
            .map(TenantScope::Tenant)
            .ok_or(AuthError::Forbidden),
    }
}

fn note_tamper(principal: &Principal, supplied: &str, tenant_id: Uuid) {
    if supplied != tenant_id.to_string() {
        warn!(
            principal_id = %principal.id,
            kind = %principal.kind,
            supplied = %supplied,
            tenant_id = %tenant_id,
            "Overwriting caller-supplied tenant id"
        );
    }
}

/// Force the tenant field of a write body to the principal's tenant.
///
/// An empty (`null`) body becomes an object holding only the tenant field.
pub fn enforce_on_body(principal: &Principal, body: &mut Value) -> Result<(), AuthError> {
    let TenantScope::Tenant(tenant_id) = scope_for(principal)? else {
        return Ok(());
    };

    if body.is_null() {
        *body = Value::Object(Default::default());
    }
    let Some(object) = body.as_object_mut() else {
        return Err(AuthError::Validation(
            "request body must be a JSON object".into(),
        ));
    };

    if let Some(supplied) = object.get(TENANT_FIELD) {
        let supplied = supplied
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| supplied.to_string());
        note_tamper(principal, &supplied, tenant_id);
    }
    object.insert(
        TENANT_FIELD.to_string(),
        Value::String(tenant_id.to_string()),
    );
    Ok(())
}

/// Force the tenant filter of a query string to the principal's tenant.
///
/// Every existing occurrence of the field is replaced by a single pair.
pub fn enforce_on_query(
    principal: &Principal,
    params: &mut Vec<(String, String)>,
) -> Result<(), AuthError> {
    let TenantScope::Tenant(tenant_id) = scope_for(principal)? else {
        return Ok(());
    };

    params.retain(|(key, value)| {
        if key == TENANT_FIELD {
            note_tamper(principal, value, tenant_id);
            false
        } else {
            true
        }
    });
    params.push((TENANT_FIELD.to_string(), tenant_id.to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn principal(kind: PrincipalKind, tenant_id: Option<Uuid>) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: "p@rentdesk.test".into(),
            kind,
            tenant_id,
        }
    }

    #[test]
    fn foreign_tenant_in_body_is_overwritten() {
        let own = Uuid::new_v4();
        let foreign = Uuid::new_v4();

        for kind in [PrincipalKind::Agency, PrincipalKind::Client] {
            let p = principal(kind, Some(own));
            let mut body = json!({ "name": "Clio", "agency_id": foreign.to_string() });

            enforce_on_body(&p, &mut body).unwrap();

            assert_eq!(body["agency_id"], own.to_string());
            assert_eq!(body["name"], "Clio");
        }
    }

    #[test]
    fn missing_tenant_in_body_is_injected() {
        let own = Uuid::new_v4();
        let p = principal(PrincipalKind::Client, Some(own));

        let mut body = json!({ "notes": "late pickup" });
        enforce_on_body(&p, &mut body).unwrap();
        assert_eq!(body["agency_id"], own.to_string());

        let mut empty = Value::Null;
        enforce_on_body(&p, &mut empty).unwrap();
        assert_eq!(empty, json!({ "agency_id": own.to_string() }));
    }

    #[test]
    fn non_object_body_is_rejected_for_tenants() {
        let p = principal(PrincipalKind::Agency, Some(Uuid::new_v4()));
        let mut body = json!([1, 2, 3]);
        assert!(matches!(
            enforce_on_body(&p, &mut body),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn platform_admin_passes_through() {
        let admin = principal(PrincipalKind::PlatformAdmin, None);
        let foreign = Uuid::new_v4().to_string();

        let mut body = json!({ "agency_id": foreign });
        enforce_on_body(&admin, &mut body).unwrap();
        assert_eq!(body, json!({ "agency_id": foreign }));

        let mut params = vec![("agency_id".to_string(), foreign.clone())];
        enforce_on_query(&admin, &mut params).unwrap();
        assert_eq!(params, vec![("agency_id".to_string(), foreign)]);

        let mut none: Vec<(String, String)> = Vec::new();
        enforce_on_query(&admin, &mut none).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn query_filter_is_replaced_not_merged() {
        let own = Uuid::new_v4();
        let p = principal(PrincipalKind::Agency, Some(own));
        let mut params = vec![
            ("agency_id".to_string(), Uuid::new_v4().to_string()),
            ("page".to_string(), "2".to_string()),
            ("agency_id".to_string(), Uuid::new_v4().to_string()),
        ];

        enforce_on_query(&p, &mut params).unwrap();

        let tenants: Vec<_> = params.iter().filter(|(k, _)| k == TENANT_FIELD).collect();
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].1, own.to_string());
        assert!(params.contains(&("page".to_string(), "2".to_string())));
    }

    #[test]
    fn agency_scope_falls_back_to_own_id() {
        let p = principal(PrincipalKind::Agency, None);
        assert_eq!(scope_for(&p).unwrap(), TenantScope::Tenant(p.id));
    }

    #[test]
    fn client_without_tenant_fails_closed() {
        let p = principal(PrincipalKind::Client, None);
        assert!(matches!(scope_for(&p), Err(AuthError::Forbidden)));
    }
}
