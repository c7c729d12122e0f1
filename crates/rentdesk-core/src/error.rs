//! Error types for the rentdesk system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RentdeskError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity} with the same {field}")]
    AlreadyExists { entity: String, field: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RentdeskError {
    /// True for lookups that found no (active) row.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RentdeskError::NotFound { .. })
    }
}

pub type RentdeskResult<T> = Result<T, RentdeskError>;
