//! SurrealDB implementation of [`ActivityLogRepository`].
//!
//! The `activity_log` table denies UPDATE and DELETE at the schema level.
//! This repository only exposes append and list.

use chrono::{DateTime, Utc};
use rentdesk_core::error::RentdeskResult;
use rentdesk_core::models::activity::{ActivityLogEntry, ActivityLogFilter};
use rentdesk_core::models::principal::PrincipalKind;
use rentdesk_core::repository::{ActivityLogRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ActivityRow {
    record_id: String,
    principal_kind: String,
    principal_id: String,
    tenant_id: Option<String>,
    action: String,
    entity_type: Option<String>,
    entity_id: Option<String>,
    description: String,
    source_address: Option<String>,
    user_agent: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl ActivityRow {
    fn try_into_entry(self) -> Result<ActivityLogEntry, DbError> {
        let principal_kind: PrincipalKind = self
            .principal_kind
            .parse()
            .map_err(|e| DbError::Corrupt(format!("{e}")))?;
        Ok(ActivityLogEntry {
            id: parse_uuid(&self.record_id, "activity")?,
            principal_kind,
            principal_id: parse_uuid(&self.principal_id, "principal")?,
            tenant_id: self
                .tenant_id
                .as_deref()
                .map(|t| parse_uuid(t, "tenant"))
                .transpose()?,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            description: self.description,
            source_address: self.source_address,
            user_agent: self.user_agent,
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the activity log repository.
#[derive(Clone)]
pub struct SurrealActivityLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealActivityLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ActivityLogRepository for SurrealActivityLogRepository<C> {
    async fn append(&self, entry: ActivityLogEntry) -> RentdeskResult<()> {
        self.db
            .query(
                "CREATE type::record('activity_log', $id) SET \
                 principal_kind = $principal_kind, \
                 principal_id = $principal_id, \
                 tenant_id = $tenant_id, action = $action, \
                 entity_type = $entity_type, entity_id = $entity_id, \
                 description = $description, \
                 source_address = $source_address, \
                 user_agent = $user_agent, \
                 metadata = $metadata, created_at = $created_at",
            )
            .bind(("id", entry.id.to_string()))
            .bind(("principal_kind", entry.principal_kind.as_str().to_string()))
            .bind(("principal_id", entry.principal_id.to_string()))
            .bind(("tenant_id", entry.tenant_id.map(|t| t.to_string())))
            .bind(("action", entry.action))
            .bind(("entity_type", entry.entity_type))
            .bind(("entity_id", entry.entity_id))
            .bind(("description", entry.description))
            .bind(("source_address", entry.source_address))
            .bind(("user_agent", entry.user_agent))
            .bind(("metadata", entry.metadata))
            .bind(("created_at", entry.created_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list(
        &self,
        filter: ActivityLogFilter,
        pagination: Pagination,
    ) -> RentdeskResult<PaginatedResult<ActivityLogEntry>> {
        let mut conditions = Vec::new();
        if filter.tenant_id.is_some() {
            conditions.push("tenant_id = $tenant_id");
        }
        if filter.principal_id.is_some() {
            conditions.push("principal_id = $principal_id");
        }
        if filter.action.is_some() {
            conditions.push("action = $action");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let tenant_id = filter.tenant_id.map(|t| t.to_string());
        let principal_id = filter.principal_id.map(|p| p.to_string());

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM activity_log {where_clause} GROUP ALL"
            ))
            .bind(("tenant_id", tenant_id.clone()))
            .bind(("principal_id", principal_id.clone()))
            .bind(("action", filter.action.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM activity_log \
                 {where_clause} \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset"
            ))
            .bind(("tenant_id", tenant_id))
            .bind(("principal_id", principal_id))
            .bind(("action", filter.action))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ActivityRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(ActivityRow::try_into_entry)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
