//! Rentdesk Database: SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Connection management and health ping ([`DbManager`], [`DbConfig`], [`ping`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Credential store and activity log repositories ([`repository`])
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager, ping};
pub use error::DbError;
pub use schema::{MigrationReport, latest_version, run_migrations};
