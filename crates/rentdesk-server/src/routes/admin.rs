//! `/api/v1/admin`: platform-wide views, platform admins only.

use axum::extract::{Query, State};
use axum::middleware::from_fn_with_state;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use rentdesk_auth::RoleGuard;
use rentdesk_core::models::agency::Agency;
use rentdesk_core::repository::AgencyRepository;
use serde::Serialize;
use surrealdb::Connection;

use super::PageParams;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{authenticate, require_kinds};
use crate::state::AppState;

pub fn router<C: Connection>(state: &AppState<C>) -> Router<AppState<C>> {
    Router::new()
        .route("/agencies", get(list_agencies::<C>))
        .route_layer(from_fn_with_state(RoleGuard::platform_admin_only(), require_kinds))
        .route_layer(from_fn_with_state(state.clone(), authenticate::<C>))
}

#[derive(Debug, Serialize)]
struct AgencyPage {
    agencies: Vec<Agency>,
    total: u64,
    offset: u64,
    limit: u64,
}

async fn list_agencies<C: Connection>(
    State(state): State<AppState<C>>,
    params: Result<Query<PageParams>, axum::extract::rejection::QueryRejection>,
) -> ApiResult<Json<AgencyPage>> {
    let Query(params) = params.map_err(|e| ApiError::validation(e.body_text()))?;

    let page = state.auth.agencies().list(params.pagination()).await?;
    Ok(Json(AgencyPage {
        agencies: page.items,
        total: page.total,
        offset: page.offset,
        limit: page.limit,
    }))
}
