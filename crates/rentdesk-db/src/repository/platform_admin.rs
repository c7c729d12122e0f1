//! SurrealDB implementation of [`PlatformAdminRepository`].

use chrono::{DateTime, Utc};
use rentdesk_core::error::RentdeskResult;
use rentdesk_core::models::platform_admin::{CreatePlatformAdmin, PlatformAdmin};
use rentdesk_core::repository::PlatformAdminRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{UpdatedRow, parse_uuid};
use crate::error::DbError;

const UNIQUE_INDEXES: &[(&str, &str)] = &[("idx_platform_admin_email", "email")];

#[derive(Debug, SurrealValue)]
struct PlatformAdminRow {
    record_id: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PlatformAdminRow {
    fn try_into_admin(self) -> Result<PlatformAdmin, DbError> {
        Ok(PlatformAdmin {
            id: parse_uuid(&self.record_id, "platform admin")?,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealPlatformAdminRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPlatformAdminRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Fetch one admin. `source` is everything after the projection, with
    /// `value` bound as `$key`.
    async fn find_one(
        &self,
        source: &str,
        key: &'static str,
        value: String,
    ) -> Result<PlatformAdmin, DbError> {
        let query = format!("SELECT meta::id(id) AS record_id, * FROM {source}");
        let mut result = self
            .db
            .query(&query)
            .bind((key, value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PlatformAdminRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: "platform_admin".into(),
                id: value,
            })?
            .try_into_admin()
    }
}

impl<C: Connection> PlatformAdminRepository for SurrealPlatformAdminRepository<C> {
    async fn create(&self, input: CreatePlatformAdmin) -> RentdeskResult<PlatformAdmin> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('platform_admin', $id) SET \
                 email = $email, password_hash = $password_hash, \
                 first_name = $first_name, last_name = $last_name, \
                 role = $role, is_active = true",
            )
            .bind(("id", id.to_string()))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("role", input.role))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| {
                DbError::from_statement(e.to_string(), "platform_admin", UNIQUE_INDEXES)
            })?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> RentdeskResult<PlatformAdmin> {
        Ok(self
            .find_one("type::record('platform_admin', $id)", "id", id.to_string())
            .await?)
    }

    async fn get_active_by_id(&self, id: Uuid) -> RentdeskResult<PlatformAdmin> {
        Ok(self
            .find_one(
                "type::record('platform_admin', $id) WHERE is_active = true",
                "id",
                id.to_string(),
            )
            .await?)
    }

    async fn get_active_by_email(&self, email: &str) -> RentdeskResult<PlatformAdmin> {
        Ok(self
            .find_one(
                "platform_admin WHERE email = $email AND is_active = true",
                "email",
                email.to_string(),
            )
            .await?)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> RentdeskResult<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('platform_admin', $id) SET \
                 is_active = $active, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?;

        let updated: Vec<UpdatedRow> = result.take(0).map_err(DbError::from)?;
        if updated.is_empty() {
            return Err(DbError::NotFound {
                entity: "platform_admin".into(),
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
