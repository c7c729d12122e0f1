//! Database-specific error types and conversions.

use rentdesk_core::error::RentdeskError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid database configuration: {0}")]
    Config(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated: {entity}.{field}")]
    Conflict { entity: String, field: String },

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl DbError {
    /// Classify a failed statement: a violation of one of the named unique
    /// indexes becomes [`DbError::Conflict`] on `entity.field`.
    pub(crate) fn from_statement(
        message: String,
        entity: &str,
        unique_indexes: &[(&str, &str)],
    ) -> Self {
        for (index, field) in unique_indexes {
            if message.contains(index) {
                return DbError::Conflict {
                    entity: entity.into(),
                    field: (*field).into(),
                };
            }
        }
        DbError::Query(message)
    }
}

impl From<DbError> for RentdeskError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => RentdeskError::NotFound { entity, id },
            DbError::Conflict { entity, field } => RentdeskError::AlreadyExists { entity, field },
            other => RentdeskError::Database(other.to_string()),
        }
    }
}
