//! Fixed-window rate limiting keyed by caller address.
//!
//! Counters live behind [`RateLimitStore`] so a single-instance deployment
//! can keep them in memory while a multi-instance one plugs in a shared
//! store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use tracing::debug;

use crate::error::AuthError;

/// Counter state of one key after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Backing store for window counters.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` at `now`, opening a fresh window of
    /// length `window` when none exists or the current one has passed.
    /// Must be atomic per key.
    async fn increment(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<WindowState, AuthError>;
}

/// Process-local store. Resets on restart.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    windows: DashMap<String, WindowState>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop windows that ended before `now`. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, state| state.reset_at >= now);
        before - self.windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn increment(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<WindowState, AuthError> {
        let window = chrono::Duration::from_std(window)
            .map_err(|e| AuthError::Validation(format!("rate limit window: {e}")))?;
        let fresh = WindowState {
            count: 1,
            reset_at: now + window,
        };

        // The entry guard holds the shard lock for the whole update.
        let mut entry = self.windows.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            reset_at: now + window,
        });
        if now > entry.reset_at {
            *entry = fresh;
        } else {
            entry.count = entry.count.saturating_add(1);
        }
        Ok(*entry)
    }
}

/// Request budget for one limiter.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RateLimitConfig {
    /// Budget for general API traffic: 100 requests per 15 minutes.
    pub fn general() -> Self {
        Self {
            max_requests: 100,
            window_secs: 900,
        }
    }

    /// Budget for login and registration: 20 requests per 15 minutes.
    pub fn auth() -> Self {
        Self {
            max_requests: 20,
            window_secs: 900,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::general()
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, config: RateLimitConfig) -> Self {
        Self {
            store,
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
        }
    }

    pub async fn check(&self, key: &str) -> Result<WindowState, AuthError> {
        self.check_at(key, Utc::now()).await
    }

    /// Count a request from `key` at `now`. Over budget yields
    /// [`AuthError::RateLimited`] with the whole seconds left in the window,
    /// rounded up.
    pub async fn check_at(&self, key: &str, now: DateTime<Utc>) -> Result<WindowState, AuthError> {
        let state = self.store.increment(key, now, self.window).await?;

        if state.count > self.max_requests {
            let remaining_ms = (state.reset_at - now).num_milliseconds().max(0) as u64;
            let retry_after_secs = remaining_ms.div_ceil(1000);
            debug!(key, count = state.count, retry_after_secs, "Rate limit exceeded");
            return Err(AuthError::RateLimited { retry_after_secs });
        }
        Ok(state)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}
