//! Shared application state.

use std::sync::Arc;

use rentdesk_auth::activity::DEFAULT_QUEUE_CAPACITY;
use rentdesk_auth::{ActivityRecorder, AuthService, RateLimitStore, RateLimiter};
use rentdesk_db::repository::{
    SurrealActivityLogRepository, SurrealAgencyRepository, SurrealClientRepository,
    SurrealPlatformAdminRepository,
};
use surrealdb::{Connection, Surreal};
use tokio::task::JoinHandle;

use crate::ServerError;
use crate::config::Config;

pub type SurrealAuthService<C> = AuthService<
    SurrealPlatformAdminRepository<C>,
    SurrealAgencyRepository<C>,
    SurrealClientRepository<C>,
>;

pub struct AppState<C: Connection> {
    pub auth: Arc<SurrealAuthService<C>>,
    pub db: Surreal<C>,
    pub activity: ActivityRecorder,
    /// Budget for general API traffic.
    pub general_limiter: RateLimiter,
    /// Tighter budget for login, registration and refresh.
    pub auth_limiter: RateLimiter,
    pub config: Arc<Config>,
}

impl<C: Connection> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            db: self.db.clone(),
            activity: self.activity.clone(),
            general_limiter: self.general_limiter.clone(),
            auth_limiter: self.auth_limiter.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<C: Connection> AppState<C> {
    /// Wire repositories, limiters and the activity writer over `db`.
    ///
    /// Both limiters share `rate_store`; their keys are kept apart by prefix.
    /// The returned handle is the activity writer task.
    pub fn build(
        db: Surreal<C>,
        config: Config,
        rate_store: Arc<dyn RateLimitStore>,
    ) -> Result<(Self, JoinHandle<()>), ServerError> {
        let auth = AuthService::new(
            SurrealPlatformAdminRepository::new(db.clone()),
            SurrealAgencyRepository::new(db.clone()),
            SurrealClientRepository::new(db.clone()),
            config.auth.clone(),
        )?;

        let (activity, writer) = ActivityRecorder::spawn(
            SurrealActivityLogRepository::new(db.clone()),
            DEFAULT_QUEUE_CAPACITY,
        );

        let state = Self {
            auth: Arc::new(auth),
            db,
            activity,
            general_limiter: RateLimiter::new(Arc::clone(&rate_store), config.rate_limit.general),
            auth_limiter: RateLimiter::new(rate_store, config.rate_limit.auth),
            config: Arc::new(config),
        };
        Ok((state, writer))
    }
}
