//! Activity log domain model (append-only audit trail).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::principal::{Principal, PrincipalKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityLogEntry {
    /// Generated locally, never assigned by storage.
    pub id: Uuid,
    pub principal_kind: PrincipalKind,
    pub principal_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub description: String,
    pub source_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    /// Start an entry for `principal` performing `action`.
    ///
    /// The description defaults to `"<action> <entity_type>"`, falling back
    /// to `"<action> resource"`.
    pub fn new(principal: &Principal, action: &str, entity_type: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            principal_kind: principal.kind,
            principal_id: principal.id,
            tenant_id: principal.tenant_id,
            action: action.to_string(),
            entity_type: entity_type.map(str::to_string),
            entity_id: None,
            description: format!("{action} {}", entity_type.unwrap_or("resource")),
            source_address: None,
            user_agent: None,
            metadata: serde_json::Value::Object(Default::default()),
            created_at: Utc::now(),
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_source(mut self, address: Option<String>, user_agent: Option<String>) -> Self {
        self.source_address = address;
        self.user_agent = user_agent;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Filter for listing activity entries.
#[derive(Debug, Clone, Default)]
pub struct ActivityLogFilter {
    pub tenant_id: Option<Uuid>,
    pub principal_id: Option<Uuid>,
    pub action: Option<String>,
}
