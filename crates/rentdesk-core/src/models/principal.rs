//! Principal model: the three kinds of identity that can authenticate.
//!
//! A principal is either a platform admin (global scope), an agency (a
//! tenant root) or a client (belongs to exactly one agency). The tenant
//! binding is derived from the stored record, never from caller input:
//!
//! | kind            | `tenant_id`          |
//! |-----------------|----------------------|
//! | `PlatformAdmin` | `None`               |
//! | `Agency`        | the agency's own id  |
//! | `Client`        | the owning agency id |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agency::Agency;
use super::client::Client;
use super::platform_admin::PlatformAdmin;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    PlatformAdmin,
    Agency,
    Client,
}

impl PrincipalKind {
    pub const ALL: [PrincipalKind; 3] = [
        PrincipalKind::PlatformAdmin,
        PrincipalKind::Agency,
        PrincipalKind::Client,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::PlatformAdmin => "platform_admin",
            PrincipalKind::Agency => "agency",
            PrincipalKind::Client => "client",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown principal kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown principal kind: {0}")]
pub struct UnknownPrincipalKind(pub String);

impl FromStr for PrincipalKind {
    type Err = UnknownPrincipalKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "platform_admin" => Ok(PrincipalKind::PlatformAdmin),
            "agency" => Ok(PrincipalKind::Agency),
            "client" => Ok(PrincipalKind::Client),
            other => Err(UnknownPrincipalKind(other.to_string())),
        }
    }
}

/// Normalized, request-scoped identity attached after authentication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub kind: PrincipalKind,
    pub tenant_id: Option<Uuid>,
}

impl Principal {
    pub fn platform_admin(admin: &PlatformAdmin) -> Self {
        Self {
            id: admin.id,
            email: admin.email.clone(),
            kind: PrincipalKind::PlatformAdmin,
            tenant_id: None,
        }
    }

    /// An agency is its own tenant root.
    pub fn agency(agency: &Agency) -> Self {
        Self {
            id: agency.id,
            email: agency.email.clone(),
            kind: PrincipalKind::Agency,
            tenant_id: Some(agency.id),
        }
    }

    pub fn client(client: &Client) -> Self {
        Self {
            id: client.id,
            email: client.email.clone(),
            kind: PrincipalKind::Client,
            tenant_id: Some(client.agency_id),
        }
    }

    pub fn is_platform_admin(&self) -> bool {
        self.kind == PrincipalKind::PlatformAdmin
    }
}

/// One stored principal row, whichever table it came from.
///
/// Serializes as the underlying record with the password hash stripped.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PrincipalRecord {
    PlatformAdmin(PlatformAdmin),
    Agency(Agency),
    Client(Client),
}

impl PrincipalRecord {
    pub fn kind(&self) -> PrincipalKind {
        match self {
            PrincipalRecord::PlatformAdmin(_) => PrincipalKind::PlatformAdmin,
            PrincipalRecord::Agency(_) => PrincipalKind::Agency,
            PrincipalRecord::Client(_) => PrincipalKind::Client,
        }
    }

    pub fn principal(&self) -> Principal {
        match self {
            PrincipalRecord::PlatformAdmin(admin) => Principal::platform_admin(admin),
            PrincipalRecord::Agency(agency) => Principal::agency(agency),
            PrincipalRecord::Client(client) => Principal::client(client),
        }
    }

    pub fn password_hash(&self) -> &str {
        match self {
            PrincipalRecord::PlatformAdmin(admin) => &admin.password_hash,
            PrincipalRecord::Agency(agency) => &agency.password_hash,
            PrincipalRecord::Client(client) => &client.password_hash,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            PrincipalRecord::PlatformAdmin(admin) => admin.is_active,
            PrincipalRecord::Agency(agency) => agency.is_active,
            PrincipalRecord::Client(client) => client.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agency::{SubscriptionPlan, SubscriptionStatus};
    use chrono::Utc;

    fn agency() -> Agency {
        Agency {
            id: Uuid::new_v4(),
            name: "Acme".into(),
            slug: "acme".into(),
            email: "a@acme.com".into(),
            password_hash: "$argon2id$secret".into(),
            phone: None,
            address: None,
            city: None,
            state: None,
            country: None,
            postal_code: None,
            website: None,
            description: None,
            subscription_plan: SubscriptionPlan::Basic,
            subscription_status: SubscriptionStatus::Trial,
            subscription_expires_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn kind_wire_names_roundtrip() {
        for kind in PrincipalKind::ALL {
            assert_eq!(kind.as_str().parse::<PrincipalKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert!("superuser".parse::<PrincipalKind>().is_err());
    }

    #[test]
    fn agency_is_its_own_tenant() {
        let a = agency();
        let p = Principal::agency(&a);
        assert_eq!(p.tenant_id, Some(a.id));
        assert_eq!(p.kind, PrincipalKind::Agency);
    }

    #[test]
    fn client_is_bound_to_owning_agency() {
        let agency_id = Uuid::new_v4();
        let client = Client {
            id: Uuid::new_v4(),
            agency_id,
            email: "c@example.com".into(),
            password_hash: "h".into(),
            first_name: "Cleo".into(),
            last_name: "Driver".into(),
            phone: None,
            date_of_birth: None,
            driver_license_number: None,
            driver_license_expiry: None,
            is_active: true,
            email_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let p = Principal::client(&client);
        assert_eq!(p.tenant_id, Some(agency_id));
        assert_ne!(p.tenant_id, Some(client.id));
    }

    #[test]
    fn record_serialization_strips_password_hash() {
        let record = PrincipalRecord::Agency(agency());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["slug"], "acme");
        assert_eq!(record.password_hash(), "$argon2id$secret");
    }
}
