//! SurrealDB repository implementations.

mod activity;
mod agency;
mod client;
mod platform_admin;

pub use activity::SurrealActivityLogRepository;
pub use agency::SurrealAgencyRepository;
pub use client::SurrealClientRepository;
pub use platform_admin::SurrealPlatformAdminRepository;

use chrono::{DateTime, Utc};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Projection of an `UPDATE` result, used only to detect a missing row.
#[derive(Debug, SurrealValue)]
struct UpdatedRow {
    #[allow(dead_code)]
    updated_at: DateTime<Utc>,
}

fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Corrupt(format!("invalid {what} UUID: {e}")))
}
