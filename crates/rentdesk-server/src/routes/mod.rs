//! HTTP routes.
//!
//! | prefix                  | router                 |
//! |-------------------------|------------------------|
//! | `/health`               | liveness + DB ping     |
//! | `/api/v1/auth`          | [`auth::router`]       |
//! | `/api/v1/agencies`      | [`agencies::router`]   |
//! | `/api/v1/clients`       | [`clients::router`]    |
//! | `/api/v1/admin`         | [`admin::router`]      |

pub mod admin;
pub mod agencies;
pub mod auth;
pub mod clients;

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use chrono::Utc;
use rentdesk_auth::ActivityRecorder;
use serde::Deserialize;
use serde_json::json;
use surrealdb::Connection;
use tracing::warn;

use crate::error::ApiError;
use crate::middleware::{ActivityTag, RateLimitGate, ScopedQuery, rate_limit};
use crate::state::AppState;
use rentdesk_core::repository::Pagination;

const MAX_PAGE_SIZE: u64 = 100;

/// Build the full application router.
pub fn build_router<C: Connection>(state: AppState<C>) -> Router {
    let general = RateLimitGate {
        limiter: state.general_limiter.clone(),
        scope: "general",
    };

    let api = Router::new()
        .route("/", get(api_info))
        .nest("/agencies", agencies::router(&state))
        .nest("/clients", clients::router(&state))
        .nest("/admin", admin::router(&state))
        .layer(from_fn_with_state(general, rate_limit))
        .nest("/auth", auth::router(&state));

    Router::new()
        .route("/health", get(health::<C>))
        .nest("/api/v1", api)
        .fallback(not_found)
        .with_state(state)
}

/// Activity layer state for one route.
pub(crate) fn activity(
    recorder: &ActivityRecorder,
    action: &'static str,
    entity_type: Option<&'static str>,
) -> ActivityTag {
    ActivityTag {
        recorder: recorder.clone(),
        action,
        entity_type,
    }
}

/// Offset pagination read from the query string.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl PageParams {
    pub fn from_scope(scope: &ScopedQuery) -> Result<Self, ApiError> {
        let parse = |key: &str| {
            scope
                .get(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map_err(|_| ApiError::validation(format!("{key} must be a non-negative integer")))
                })
                .transpose()
        };
        Ok(Self {
            offset: parse("offset")?,
            limit: parse("limit")?,
        })
    }

    pub fn pagination(&self) -> Pagination {
        let default = Pagination::default();
        Pagination {
            offset: self.offset.unwrap_or(default.offset),
            limit: self.limit.unwrap_or(default.limit).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

async fn api_info() -> Json<serde_json::Value> {
    Json(json!({
        "message": "rentdesk API",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Liveness plus a round trip to the database.
async fn health<C: Connection>(State(state): State<AppState<C>>) -> impl IntoResponse {
    let ping = rentdesk_db::ping(&state.db).await;

    let environment = state.config.server.environment.clone();
    match ping {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "OK",
                "timestamp": Utc::now().to_rfc3339(),
                "database": "connected",
                "environment": environment,
                "version": env!("CARGO_PKG_VERSION"),
            })),
        ),
        Err(e) => {
            warn!(error = %e, "Health check database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "Service Unavailable",
                    "timestamp": Utc::now().to_rfc3339(),
                    "database": "error",
                    "environment": environment,
                })),
            )
        }
    }
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::route_not_found().at(&method, &uri)
}
