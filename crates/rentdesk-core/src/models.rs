//! Domain models for rentdesk.
//!
//! These are the core types shared across all crates.

pub mod activity;
pub mod agency;
pub mod client;
pub mod platform_admin;
pub mod principal;
