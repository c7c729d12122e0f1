//! SurrealDB implementation of [`AgencyRepository`].
//!
//! Creating an agency also writes its branding settings and the default
//! car categories inside one transaction, so a tenant never exists without
//! them.

use chrono::{DateTime, Duration, Utc};
use rentdesk_core::error::RentdeskResult;
use rentdesk_core::models::agency::{
    Agency, AgencySettings, CreateAgency, DEFAULT_CAR_CATEGORIES, DEFAULT_FONT_FAMILY,
    DEFAULT_PRIMARY_COLOR, DEFAULT_SECONDARY_COLOR, SubscriptionPlan, SubscriptionStatus,
    TRIAL_PERIOD_DAYS, UpdateAgency, UpdateAgencySettings,
};
use rentdesk_core::repository::{AgencyRepository, PaginatedResult, Pagination};
use serde_json::json;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, UpdatedRow, parse_uuid};
use crate::error::DbError;

const UNIQUE_INDEXES: &[(&str, &str)] = &[
    ("idx_agency_email", "email"),
    ("idx_agency_slug", "slug"),
];

#[derive(Debug, SurrealValue)]
struct AgencyRow {
    record_id: String,
    name: String,
    slug: String,
    email: String,
    password_hash: String,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    postal_code: Option<String>,
    website: Option<String>,
    description: Option<String>,
    subscription_plan: String,
    subscription_status: String,
    subscription_expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SettingsRow {
    agency_id: String,
    logo_url: Option<String>,
    primary_color: String,
    secondary_color: String,
    font_family: String,
    custom_css: Option<String>,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    terms_and_conditions: Option<String>,
    privacy_policy: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CategoryNameRow {
    name: String,
}

fn parse_plan(s: &str) -> Result<SubscriptionPlan, DbError> {
    match s {
        "basic" => Ok(SubscriptionPlan::Basic),
        "premium" => Ok(SubscriptionPlan::Premium),
        "enterprise" => Ok(SubscriptionPlan::Enterprise),
        other => Err(DbError::Corrupt(format!("unknown subscription plan: {other}"))),
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DbError> {
    match s {
        "trial" => Ok(SubscriptionStatus::Trial),
        "active" => Ok(SubscriptionStatus::Active),
        "suspended" => Ok(SubscriptionStatus::Suspended),
        "cancelled" => Ok(SubscriptionStatus::Cancelled),
        other => Err(DbError::Corrupt(format!("unknown subscription status: {other}"))),
    }
}

impl AgencyRow {
    fn try_into_agency(self) -> Result<Agency, DbError> {
        Ok(Agency {
            id: parse_uuid(&self.record_id, "agency")?,
            name: self.name,
            slug: self.slug,
            email: self.email,
            password_hash: self.password_hash,
            phone: self.phone,
            address: self.address,
            city: self.city,
            state: self.state,
            country: self.country,
            postal_code: self.postal_code,
            website: self.website,
            description: self.description,
            subscription_plan: parse_plan(&self.subscription_plan)?,
            subscription_status: parse_status(&self.subscription_status)?,
            subscription_expires_at: self.subscription_expires_at,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl SettingsRow {
    fn try_into_settings(self) -> Result<AgencySettings, DbError> {
        Ok(AgencySettings {
            agency_id: parse_uuid(&self.agency_id, "agency")?,
            logo_url: self.logo_url,
            primary_color: self.primary_color,
            secondary_color: self.secondary_color,
            font_family: self.font_family,
            custom_css: self.custom_css,
            contact_email: self.contact_email,
            contact_phone: self.contact_phone,
            terms_and_conditions: self.terms_and_conditions,
            privacy_policy: self.privacy_policy,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Agency repository.
#[derive(Clone)]
pub struct SurrealAgencyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAgencyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_one(
        &self,
        source: &str,
        key: &'static str,
        value: String,
    ) -> Result<Agency, DbError> {
        let query = format!("SELECT meta::id(id) AS record_id, * FROM {source}");
        let mut result = self
            .db
            .query(&query)
            .bind((key, value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgencyRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: "agency".into(),
                id: value,
            })?
            .try_into_agency()
    }

    async fn count_where(&self, filter: &str, key: &'static str, value: String) -> Result<u64, DbError> {
        let query = format!("SELECT count() AS total FROM agency WHERE {filter} GROUP ALL");
        let mut result = self
            .db
            .query(&query)
            .bind((key, value))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

impl<C: Connection> AgencyRepository for SurrealAgencyRepository<C> {
    async fn create(&self, input: CreateAgency) -> RentdeskResult<Agency> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let expires_at = Utc::now() + Duration::days(TRIAL_PERIOD_DAYS);

        let categories: Vec<serde_json::Value> = DEFAULT_CAR_CATEGORIES
            .iter()
            .map(|(name, description)| {
                json!({
                    "agency_id": id_str,
                    "name": name,
                    "description": description,
                })
            })
            .collect();

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('agency', $id) SET \
                 name = $name, slug = $slug, email = $email, \
                 password_hash = $password_hash, \
                 phone = $phone, address = $address, city = $city, \
                 state = $state, country = $country, \
                 postal_code = $postal_code, \
                 subscription_plan = 'basic', \
                 subscription_status = 'trial', \
                 subscription_expires_at = $expires_at, \
                 is_active = true; \
                 CREATE type::record('agency_settings', $id) SET \
                 agency_id = $id, primary_color = $primary_color, \
                 secondary_color = $secondary_color, \
                 font_family = $font_family, contact_email = $email, \
                 contact_phone = $phone; \
                 INSERT INTO car_category $categories; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("slug", input.slug))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("phone", input.phone))
            .bind(("address", input.address))
            .bind(("city", input.city))
            .bind(("state", input.state))
            .bind(("country", input.country))
            .bind(("postal_code", input.postal_code))
            .bind(("expires_at", expires_at))
            .bind(("primary_color", DEFAULT_PRIMARY_COLOR.to_string()))
            .bind(("secondary_color", DEFAULT_SECONDARY_COLOR.to_string()))
            .bind(("font_family", DEFAULT_FONT_FAMILY.to_string()))
            .bind(("categories", categories))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(e.to_string(), "agency", UNIQUE_INDEXES))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> RentdeskResult<Agency> {
        Ok(self
            .find_one("type::record('agency', $id)", "id", id.to_string())
            .await?)
    }

    async fn get_active_by_id(&self, id: Uuid) -> RentdeskResult<Agency> {
        Ok(self
            .find_one(
                "type::record('agency', $id) WHERE is_active = true",
                "id",
                id.to_string(),
            )
            .await?)
    }

    async fn get_active_by_email(&self, email: &str) -> RentdeskResult<Agency> {
        Ok(self
            .find_one(
                "agency WHERE email = $email AND is_active = true",
                "email",
                email.to_string(),
            )
            .await?)
    }

    async fn get_active_by_slug(&self, slug: &str) -> RentdeskResult<Agency> {
        Ok(self
            .find_one(
                "agency WHERE slug = $slug AND is_active = true",
                "slug",
                slug.to_string(),
            )
            .await?)
    }

    async fn email_exists(&self, email: &str) -> RentdeskResult<bool> {
        Ok(self.count_where("email = $email", "email", email.to_string()).await? > 0)
    }

    async fn slug_exists(&self, slug: &str) -> RentdeskResult<bool> {
        Ok(self.count_where("slug = $slug", "slug", slug.to_string()).await? > 0)
    }

    async fn update_profile(&self, id: Uuid, input: UpdateAgency) -> RentdeskResult<Agency> {
        let fields = [
            ("name", input.name),
            ("phone", input.phone),
            ("address", input.address),
            ("city", input.city),
            ("state", input.state),
            ("country", input.country),
            ("postal_code", input.postal_code),
            ("website", input.website),
            ("description", input.description),
        ];

        let mut sets: Vec<String> = fields
            .iter()
            .filter(|(_, value)| value.is_some())
            .map(|(field, _)| format!("{field} = ${field}"))
            .collect();
        sets.push("updated_at = time::now()".into());

        let query = format!(
            "UPDATE type::record('agency', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        for (field, value) in fields {
            if let Some(value) = value {
                builder = builder.bind((field, value));
            }
        }

        let mut result = builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let updated: Vec<UpdatedRow> = result.take(0).map_err(DbError::from)?;
        if updated.is_empty() {
            return Err(DbError::NotFound {
                entity: "agency".into(),
                id: id.to_string(),
            }
            .into());
        }

        self.get_by_id(id).await
    }

    async fn set_active(&self, id: Uuid, active: bool) -> RentdeskResult<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('agency', $id) SET \
                 is_active = $active, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?;

        let updated: Vec<UpdatedRow> = result.take(0).map_err(DbError::from)?;
        if updated.is_empty() {
            return Err(DbError::NotFound {
                entity: "agency".into(),
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn get_settings(&self, agency_id: Uuid) -> RentdeskResult<AgencySettings> {
        let id_str = agency_id.to_string();
        let mut result = self
            .db
            .query("SELECT * FROM type::record('agency_settings', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SettingsRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "agency_settings".into(),
            id: id_str,
        })?;

        Ok(row.try_into_settings()?)
    }

    async fn update_settings(
        &self,
        agency_id: Uuid,
        input: UpdateAgencySettings,
    ) -> RentdeskResult<AgencySettings> {
        // Settings never outlive or precede their agency.
        self.get_by_id(agency_id).await?;

        // Branding columns fall back to their defaults when the row is new.
        let branding = [
            ("primary_color", input.primary_color, DEFAULT_PRIMARY_COLOR),
            ("secondary_color", input.secondary_color, DEFAULT_SECONDARY_COLOR),
            ("font_family", input.font_family, DEFAULT_FONT_FAMILY),
        ];
        let optional = [
            ("logo_url", input.logo_url),
            ("custom_css", input.custom_css),
            ("contact_email", input.contact_email),
            ("contact_phone", input.contact_phone),
            ("terms_and_conditions", input.terms_and_conditions),
            ("privacy_policy", input.privacy_policy),
        ];

        let mut sets = vec!["agency_id = $id".to_string()];
        for (field, value, _) in &branding {
            sets.push(match value {
                Some(_) => format!("{field} = ${field}"),
                None => format!("{field} = {field} ?? $default_{field}"),
            });
        }
        sets.extend(
            optional
                .iter()
                .filter(|(_, value)| value.is_some())
                .map(|(field, _)| format!("{field} = ${field}")),
        );
        sets.push("updated_at = time::now()".into());

        let query = format!(
            "UPSERT type::record('agency_settings', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", agency_id.to_string()));
        for (field, value, default) in branding {
            builder = match value {
                Some(value) => builder.bind((field, value)),
                None => builder.bind((format!("default_{field}"), default.to_string())),
            };
        }
        for (field, value) in optional {
            if let Some(value) = value {
                builder = builder.bind((field, value));
            }
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get_settings(agency_id).await
    }

    async fn list_category_names(&self, agency_id: Uuid) -> RentdeskResult<Vec<String>> {
        let mut result = self
            .db
            .query("SELECT name FROM car_category WHERE agency_id = $agency_id")
            .bind(("agency_id", agency_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CategoryNameRow> = result.take(0).map_err(DbError::from)?;
        let mut names: Vec<String> = rows.into_iter().map(|r| r.name).collect();
        names.sort();
        Ok(names)
    }

    async fn list(&self, pagination: Pagination) -> RentdeskResult<PaginatedResult<Agency>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM agency GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM agency \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AgencyRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(AgencyRow::try_into_agency)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
