//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Client lookups always take the
//! owning `agency_id` because client email uniqueness is per tenant.
//!
//! The `get_active_*` lookups back authentication: they return
//! [`RentdeskError::NotFound`](crate::error::RentdeskError::NotFound) for a
//! row whose `is_active` flag is false, so a suspended principal is
//! indistinguishable from a deleted one.

use uuid::Uuid;

use crate::error::RentdeskResult;
use crate::models::{
    activity::{ActivityLogEntry, ActivityLogFilter},
    agency::{Agency, AgencySettings, CreateAgency, UpdateAgency, UpdateAgencySettings},
    client::{Client, CreateClient},
    platform_admin::{CreatePlatformAdmin, PlatformAdmin},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Principals (global scope)
// ---------------------------------------------------------------------------

pub trait PlatformAdminRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePlatformAdmin,
    ) -> impl Future<Output = RentdeskResult<PlatformAdmin>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RentdeskResult<PlatformAdmin>> + Send;
    fn get_active_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = RentdeskResult<PlatformAdmin>> + Send;
    fn get_active_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = RentdeskResult<PlatformAdmin>> + Send;
    fn set_active(&self, id: Uuid, active: bool)
    -> impl Future<Output = RentdeskResult<()>> + Send;
}

pub trait AgencyRepository: Send + Sync {
    /// Create the agency together with its default settings and car
    /// categories.
    fn create(&self, input: CreateAgency) -> impl Future<Output = RentdeskResult<Agency>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = RentdeskResult<Agency>> + Send;
    fn get_active_by_id(&self, id: Uuid) -> impl Future<Output = RentdeskResult<Agency>> + Send;
    fn get_active_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = RentdeskResult<Agency>> + Send;
    fn get_active_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = RentdeskResult<Agency>> + Send;
    fn email_exists(&self, email: &str) -> impl Future<Output = RentdeskResult<bool>> + Send;
    fn slug_exists(&self, slug: &str) -> impl Future<Output = RentdeskResult<bool>> + Send;
    fn update_profile(
        &self,
        id: Uuid,
        input: UpdateAgency,
    ) -> impl Future<Output = RentdeskResult<Agency>> + Send;
    fn set_active(&self, id: Uuid, active: bool)
    -> impl Future<Output = RentdeskResult<()>> + Send;
    fn get_settings(
        &self,
        agency_id: Uuid,
    ) -> impl Future<Output = RentdeskResult<AgencySettings>> + Send;
    /// Apply the given branding fields, creating default settings first
    /// when the agency has none.
    fn update_settings(
        &self,
        agency_id: Uuid,
        input: UpdateAgencySettings,
    ) -> impl Future<Output = RentdeskResult<AgencySettings>> + Send;
    /// Names of the car categories owned by the agency.
    fn list_category_names(
        &self,
        agency_id: Uuid,
    ) -> impl Future<Output = RentdeskResult<Vec<String>>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = RentdeskResult<PaginatedResult<Agency>>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped principals
// ---------------------------------------------------------------------------

pub trait ClientRepository: Send + Sync {
    fn create(&self, input: CreateClient) -> impl Future<Output = RentdeskResult<Client>> + Send;
    fn get_by_id(
        &self,
        agency_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = RentdeskResult<Client>> + Send;
    fn get_active_by_id(
        &self,
        agency_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = RentdeskResult<Client>> + Send;
    fn get_active_by_email(
        &self,
        agency_id: Uuid,
        email: &str,
    ) -> impl Future<Output = RentdeskResult<Client>> + Send;
    fn email_exists(
        &self,
        agency_id: Uuid,
        email: &str,
    ) -> impl Future<Output = RentdeskResult<bool>> + Send;
    fn set_active(
        &self,
        agency_id: Uuid,
        id: Uuid,
        active: bool,
    ) -> impl Future<Output = RentdeskResult<()>> + Send;
    /// List clients, restricted to one agency when `agency_id` is set.
    fn list(
        &self,
        agency_id: Option<Uuid>,
        pagination: Pagination,
    ) -> impl Future<Output = RentdeskResult<PaginatedResult<Client>>> + Send;
}

// ---------------------------------------------------------------------------
// Activity log (append-only)
// ---------------------------------------------------------------------------

pub trait ActivityLogRepository: Send + Sync {
    fn append(&self, entry: ActivityLogEntry) -> impl Future<Output = RentdeskResult<()>> + Send;
    fn list(
        &self,
        filter: ActivityLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = RentdeskResult<PaginatedResult<ActivityLogEntry>>> + Send;
}
