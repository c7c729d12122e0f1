//! SurrealDB implementation of [`ClientRepository`].
//!
//! Every query is scoped by `agency_id`. Calendar dates are stored as
//! `YYYY-MM-DD` strings.

use chrono::{DateTime, NaiveDate, Utc};
use rentdesk_core::error::RentdeskResult;
use rentdesk_core::models::client::{Client, CreateClient};
use rentdesk_core::repository::{ClientRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, UpdatedRow, parse_uuid};
use crate::error::DbError;

const UNIQUE_INDEXES: &[(&str, &str)] = &[("idx_client_agency_email", "email")];
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, SurrealValue)]
struct ClientRow {
    record_id: String,
    agency_id: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    date_of_birth: Option<String>,
    driver_license_number: Option<String>,
    driver_license_expiry: Option<String>,
    is_active: bool,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_date(value: Option<String>) -> Result<Option<NaiveDate>, DbError> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT)
                .map_err(|e| DbError::Corrupt(format!("invalid date {s:?}: {e}")))
        })
        .transpose()
}

fn format_date(value: Option<NaiveDate>) -> Option<String> {
    value.map(|d| d.format(DATE_FORMAT).to_string())
}

impl ClientRow {
    fn try_into_client(self) -> Result<Client, DbError> {
        Ok(Client {
            id: parse_uuid(&self.record_id, "client")?,
            agency_id: parse_uuid(&self.agency_id, "agency")?,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            date_of_birth: parse_date(self.date_of_birth)?,
            driver_license_number: self.driver_license_number,
            driver_license_expiry: parse_date(self.driver_license_expiry)?,
            is_active: self.is_active,
            email_verified: self.email_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Client repository.
#[derive(Clone)]
pub struct SurrealClientRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealClientRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_one(
        &self,
        source: &str,
        agency_id: Uuid,
        key: &'static str,
        value: String,
    ) -> Result<Client, DbError> {
        let query = format!("SELECT meta::id(id) AS record_id, * FROM {source}");
        let mut result = self
            .db
            .query(&query)
            .bind(("agency_id", agency_id.to_string()))
            .bind((key, value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ClientRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: "client".into(),
                id: value,
            })?
            .try_into_client()
    }
}

impl<C: Connection> ClientRepository for SurrealClientRepository<C> {
    async fn create(&self, input: CreateClient) -> RentdeskResult<Client> {
        let id = Uuid::new_v4();
        let agency_id = input.agency_id;

        self.db
            .query(
                "CREATE type::record('client', $id) SET \
                 agency_id = $agency_id, email = $email, \
                 password_hash = $password_hash, \
                 first_name = $first_name, last_name = $last_name, \
                 phone = $phone, date_of_birth = $date_of_birth, \
                 driver_license_number = $driver_license_number, \
                 driver_license_expiry = $driver_license_expiry, \
                 is_active = true, email_verified = false",
            )
            .bind(("id", id.to_string()))
            .bind(("agency_id", agency_id.to_string()))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("phone", input.phone))
            .bind(("date_of_birth", format_date(input.date_of_birth)))
            .bind(("driver_license_number", input.driver_license_number))
            .bind((
                "driver_license_expiry",
                format_date(input.driver_license_expiry),
            ))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_statement(e.to_string(), "client", UNIQUE_INDEXES))?;

        self.get_by_id(agency_id, id).await
    }

    async fn get_by_id(&self, agency_id: Uuid, id: Uuid) -> RentdeskResult<Client> {
        Ok(self
            .find_one(
                "type::record('client', $id) WHERE agency_id = $agency_id",
                agency_id,
                "id",
                id.to_string(),
            )
            .await?)
    }

    async fn get_active_by_id(&self, agency_id: Uuid, id: Uuid) -> RentdeskResult<Client> {
        Ok(self
            .find_one(
                "type::record('client', $id) \
                 WHERE agency_id = $agency_id AND is_active = true",
                agency_id,
                "id",
                id.to_string(),
            )
            .await?)
    }

    async fn get_active_by_email(&self, agency_id: Uuid, email: &str) -> RentdeskResult<Client> {
        Ok(self
            .find_one(
                "client WHERE agency_id = $agency_id AND email = $email \
                 AND is_active = true",
                agency_id,
                "email",
                email.to_string(),
            )
            .await?)
    }

    async fn email_exists(&self, agency_id: Uuid, email: &str) -> RentdeskResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM client \
                 WHERE agency_id = $agency_id AND email = $email GROUP ALL",
            )
            .bind(("agency_id", agency_id.to_string()))
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn set_active(&self, agency_id: Uuid, id: Uuid, active: bool) -> RentdeskResult<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('client', $id) SET \
                 is_active = $active, updated_at = time::now() \
                 WHERE agency_id = $agency_id",
            )
            .bind(("id", id.to_string()))
            .bind(("agency_id", agency_id.to_string()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?;

        let updated: Vec<UpdatedRow> = result.take(0).map_err(DbError::from)?;
        if updated.is_empty() {
            return Err(DbError::NotFound {
                entity: "client".into(),
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn list(
        &self,
        agency_id: Option<Uuid>,
        pagination: Pagination,
    ) -> RentdeskResult<PaginatedResult<Client>> {
        let filter = if agency_id.is_some() {
            "WHERE agency_id = $agency_id"
        } else {
            ""
        };
        let agency_id_str = agency_id.map(|id| id.to_string());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM client {filter} GROUP ALL"
            ))
            .bind(("agency_id", agency_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM client {filter} \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset"
            ))
            .bind(("agency_id", agency_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ClientRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ClientRow::try_into_client)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
