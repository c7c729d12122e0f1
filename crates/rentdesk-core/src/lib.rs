//! rentdesk core: domain models, the shared error type and the
//! repository traits that every storage backend implements.

pub mod error;
pub mod models;
pub mod repository;
