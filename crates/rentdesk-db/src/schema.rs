//! rentdesk store schema and the migration runner.
//!
//! Tables are SCHEMAFULL. Ids are stored as UUID strings in the record key,
//! enums as snake_case strings. Each migration is applied at most once
//! per database; `_migration` remembers which versions ran.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

const LEDGER_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

/// One versioned schema change.
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "principals_and_activity",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "agency_branding_content",
        sql: SCHEMA_V2,
    },
];

#[derive(Debug, SurrealValue)]
struct AppliedVersion {
    version: u32,
}

/// What [`run_migrations`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Versions applied by this run, oldest first.
    pub applied: Vec<u32>,
    /// Highest version now present.
    pub schema_version: u32,
}

impl MigrationReport {
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Schema version the running code expects.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Platform admins (global scope)
-- =======================================================================
DEFINE TABLE platform_admin SCHEMAFULL;
DEFINE FIELD email ON TABLE platform_admin TYPE string;
DEFINE FIELD password_hash ON TABLE platform_admin TYPE string;
DEFINE FIELD first_name ON TABLE platform_admin TYPE string;
DEFINE FIELD last_name ON TABLE platform_admin TYPE string;
DEFINE FIELD role ON TABLE platform_admin TYPE string;
DEFINE FIELD is_active ON TABLE platform_admin TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE platform_admin TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE platform_admin TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_platform_admin_email ON TABLE platform_admin \
    COLUMNS email UNIQUE;

-- =======================================================================
-- Agencies (tenant roots, global scope)
-- =======================================================================
DEFINE TABLE agency SCHEMAFULL;
DEFINE FIELD name ON TABLE agency TYPE string;
DEFINE FIELD slug ON TABLE agency TYPE string;
DEFINE FIELD email ON TABLE agency TYPE string;
DEFINE FIELD password_hash ON TABLE agency TYPE string;
DEFINE FIELD phone ON TABLE agency TYPE option<string>;
DEFINE FIELD address ON TABLE agency TYPE option<string>;
DEFINE FIELD city ON TABLE agency TYPE option<string>;
DEFINE FIELD state ON TABLE agency TYPE option<string>;
DEFINE FIELD country ON TABLE agency TYPE option<string>;
DEFINE FIELD postal_code ON TABLE agency TYPE option<string>;
DEFINE FIELD website ON TABLE agency TYPE option<string>;
DEFINE FIELD description ON TABLE agency TYPE option<string>;
DEFINE FIELD subscription_plan ON TABLE agency TYPE string \
    ASSERT $value IN ['basic', 'premium', 'enterprise'];
DEFINE FIELD subscription_status ON TABLE agency TYPE string \
    ASSERT $value IN ['trial', 'active', 'suspended', 'cancelled'];
DEFINE FIELD subscription_expires_at ON TABLE agency \
    TYPE option<datetime>;
DEFINE FIELD is_active ON TABLE agency TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE agency TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE agency TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_agency_slug ON TABLE agency COLUMNS slug UNIQUE;
DEFINE INDEX idx_agency_email ON TABLE agency COLUMNS email UNIQUE;

-- =======================================================================
-- Agency settings (tenant scope, one row per agency)
-- =======================================================================
DEFINE TABLE agency_settings SCHEMAFULL;
DEFINE FIELD agency_id ON TABLE agency_settings TYPE string;
DEFINE FIELD primary_color ON TABLE agency_settings TYPE string;
DEFINE FIELD secondary_color ON TABLE agency_settings TYPE string;
DEFINE FIELD font_family ON TABLE agency_settings TYPE string;
DEFINE FIELD contact_email ON TABLE agency_settings TYPE option<string>;
DEFINE FIELD contact_phone ON TABLE agency_settings TYPE option<string>;
DEFINE FIELD created_at ON TABLE agency_settings TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE agency_settings TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_agency_settings_agency ON TABLE agency_settings \
    COLUMNS agency_id UNIQUE;

-- =======================================================================
-- Car categories (tenant scope)
-- =======================================================================
DEFINE TABLE car_category SCHEMAFULL;
DEFINE FIELD agency_id ON TABLE car_category TYPE string;
DEFINE FIELD name ON TABLE car_category TYPE string;
DEFINE FIELD description ON TABLE car_category TYPE option<string>;
DEFINE FIELD created_at ON TABLE car_category TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_car_category_agency_name ON TABLE car_category \
    COLUMNS agency_id, name UNIQUE;

-- =======================================================================
-- Clients (tenant scope: email unique per agency only)
-- =======================================================================
DEFINE TABLE client SCHEMAFULL;
DEFINE FIELD agency_id ON TABLE client TYPE string;
DEFINE FIELD email ON TABLE client TYPE string;
DEFINE FIELD password_hash ON TABLE client TYPE string;
DEFINE FIELD first_name ON TABLE client TYPE string;
DEFINE FIELD last_name ON TABLE client TYPE string;
DEFINE FIELD phone ON TABLE client TYPE option<string>;
DEFINE FIELD date_of_birth ON TABLE client TYPE option<string>;
DEFINE FIELD driver_license_number ON TABLE client TYPE option<string>;
DEFINE FIELD driver_license_expiry ON TABLE client TYPE option<string>;
DEFINE FIELD is_active ON TABLE client TYPE bool DEFAULT true;
DEFINE FIELD email_verified ON TABLE client TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE client TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE client TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_client_agency_email ON TABLE client \
    COLUMNS agency_id, email UNIQUE;

-- =======================================================================
-- Activity log (append-only)
-- =======================================================================
DEFINE TABLE activity_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD principal_kind ON TABLE activity_log TYPE string \
    ASSERT $value IN ['platform_admin', 'agency', 'client'];
DEFINE FIELD principal_id ON TABLE activity_log TYPE string;
DEFINE FIELD tenant_id ON TABLE activity_log TYPE option<string>;
DEFINE FIELD action ON TABLE activity_log TYPE string;
DEFINE FIELD entity_type ON TABLE activity_log TYPE option<string>;
DEFINE FIELD entity_id ON TABLE activity_log TYPE option<string>;
DEFINE FIELD description ON TABLE activity_log TYPE string;
DEFINE FIELD source_address ON TABLE activity_log TYPE option<string>;
DEFINE FIELD user_agent ON TABLE activity_log TYPE option<string>;
DEFINE FIELD metadata ON TABLE activity_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE activity_log TYPE datetime;
DEFINE INDEX idx_activity_tenant_time ON TABLE activity_log \
    COLUMNS tenant_id, created_at;
DEFINE INDEX idx_activity_principal ON TABLE activity_log \
    COLUMNS principal_id;
";

// -----------------------------------------------------------------------
// Schema v2: editable branding content on agency settings
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE FIELD logo_url ON TABLE agency_settings TYPE option<string>;
DEFINE FIELD custom_css ON TABLE agency_settings TYPE option<string>;
DEFINE FIELD terms_and_conditions ON TABLE agency_settings \
    TYPE option<string>;
DEFINE FIELD privacy_policy ON TABLE agency_settings TYPE option<string>;
";

async fn applied_versions<C: Connection>(db: &Surreal<C>) -> Result<Vec<u32>, DbError> {
    let mut result = db.query("SELECT version FROM _migration").await?;
    let rows: Vec<AppliedVersion> = result.take(0)?;
    Ok(rows.into_iter().map(|r| r.version).collect())
}

/// Bring the rentdesk schema up to [`latest_version`].
///
/// Every version missing from `_migration` is applied in order and then
/// recorded, so the call is safe on every start.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<MigrationReport, DbError> {
    db.query(LEDGER_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("migration ledger: {e}")))?;

    let done = applied_versions(db).await?;
    let mut report = MigrationReport {
        applied: Vec::new(),
        schema_version: done.iter().copied().max().unwrap_or(0),
    };

    for migration in MIGRATIONS.iter().filter(|m| !done.contains(&m.version)) {
        debug!(version = migration.version, name = migration.name, "Applying schema migration");

        db.query(migration.sql)
            .await?
            .check()
            .map_err(|e| DbError::Migration(format!("v{} {}: {e}", migration.version, migration.name)))?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!("recording v{} {}: {e}", migration.version, migration.name))
            })?;

        report.applied.push(migration.version);
        report.schema_version = report.schema_version.max(migration.version);
    }

    if report.is_up_to_date() {
        debug!(schema_version = report.schema_version, "Store schema up to date");
    } else {
        info!(
            applied = ?report.applied,
            schema_version = report.schema_version,
            "Store schema migrated"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_every_principal_table() {
        for table in ["platform_admin", "agency", "client", "activity_log"] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn client_email_is_unique_per_agency_only() {
        assert!(SCHEMA_V1.contains("COLUMNS agency_id, email UNIQUE"));
        assert!(!SCHEMA_V1.contains("ON TABLE client COLUMNS email UNIQUE"));
    }

    #[test]
    fn versions_are_contiguous_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1, "{}", migration.name);
        }
        assert_eq!(latest_version(), MIGRATIONS.len() as u32);
    }

    #[test]
    fn branding_content_only_extends_settings() {
        for line in SCHEMA_V2.lines().filter(|l| l.starts_with("DEFINE")) {
            assert!(line.starts_with("DEFINE FIELD"), "{line}");
        }
        assert!(SCHEMA_V2.contains("ON TABLE agency_settings"));
    }
}
