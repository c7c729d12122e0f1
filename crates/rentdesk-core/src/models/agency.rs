//! Agency domain model.
//!
//! An agency is a tenant: its own id doubles as the tenant id for every
//! row scoped beneath it (clients, fleet, reservations). `slug` and
//! `email` are globally unique.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Days of free trial granted to a newly registered agency.
pub const TRIAL_PERIOD_DAYS: i64 = 30;

pub const DEFAULT_PRIMARY_COLOR: &str = "#3B82F6";
pub const DEFAULT_SECONDARY_COLOR: &str = "#1F2937";
pub const DEFAULT_FONT_FAMILY: &str = "Inter";

/// Car categories seeded for every new agency, as `(name, description)`.
pub const DEFAULT_CAR_CATEGORIES: &[(&str, &str)] = &[
    ("Economy", "Fuel-efficient and budget-friendly vehicles"),
    ("Compact", "Small cars perfect for city driving"),
    ("SUV", "Spacious vehicles for families and groups"),
    ("Luxury", "Premium vehicles with high-end features"),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Basic,
    Premium,
    Enterprise,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Suspended,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agency {
    pub id: Uuid,
    pub name: String,
    /// URL-safe unique tenant key (e.g. `acme`).
    pub slug: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub subscription_plan: SubscriptionPlan,
    pub subscription_status: SubscriptionStatus,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new agency.
///
/// The password is already hashed; storage never sees plaintext.
#[derive(Debug, Clone)]
pub struct CreateAgency {
    pub name: String,
    pub slug: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

/// Profile fields an agency may edit on itself.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAgency {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
}

impl UpdateAgency {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.country.is_none()
            && self.postal_code.is_none()
            && self.website.is_none()
            && self.description.is_none()
    }
}

/// Branding settings created alongside every agency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgencySettings {
    pub agency_id: Uuid,
    pub logo_url: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub font_family: String,
    pub custom_css: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub privacy_policy: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Branding fields an agency may edit; `None` leaves a field unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAgencySettings {
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub font_family: Option<String>,
    pub custom_css: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub privacy_policy: Option<String>,
}

impl UpdateAgencySettings {
    pub fn is_empty(&self) -> bool {
        self.logo_url.is_none()
            && self.primary_color.is_none()
            && self.secondary_color.is_none()
            && self.font_family.is_none()
            && self.custom_css.is_none()
            && self.contact_email.is_none()
            && self.contact_phone.is_none()
            && self.terms_and_conditions.is_none()
            && self.privacy_policy.is_none()
    }
}

/// `true` for a `#RRGGBB` hex color.
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
