//! `/api/v1/clients`: tenant-scoped client listing.
//!
//! Agencies see only their own clients; the tenant filter they send is
//! replaced before the handler runs. Platform admins may filter by any
//! agency or list across all of them.

use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::response::Json;
use axum::routing::get;
use axum::{Extension, Router};
use rentdesk_auth::RoleGuard;
use rentdesk_core::models::client::Client;
use rentdesk_core::models::principal::PrincipalKind;
use rentdesk_core::repository::ClientRepository;
use serde::Serialize;
use surrealdb::Connection;

use super::PageParams;
use crate::error::ApiResult;
use crate::middleware::{ScopedQuery, authenticate, enforce_tenant_isolation, require_kinds};
use crate::state::AppState;

pub fn router<C: Connection>(state: &AppState<C>) -> Router<AppState<C>> {
    Router::new()
        .route("/", get(list_clients::<C>))
        .route_layer(from_fn_with_state(
            state.config.server.body_limit_bytes,
            enforce_tenant_isolation,
        ))
        .route_layer(from_fn_with_state(
            RoleGuard::new(&[PrincipalKind::Agency, PrincipalKind::PlatformAdmin]),
            require_kinds,
        ))
        .route_layer(from_fn_with_state(state.clone(), authenticate::<C>))
}

#[derive(Debug, Serialize)]
struct ClientPage {
    clients: Vec<Client>,
    total: u64,
    offset: u64,
    limit: u64,
}

async fn list_clients<C: Connection>(
    State(state): State<AppState<C>>,
    Extension(scope): Extension<ScopedQuery>,
) -> ApiResult<Json<ClientPage>> {
    let agency_id = scope.tenant_id()?;
    let pagination = PageParams::from_scope(&scope)?.pagination();

    let page = state.auth.clients().list(agency_id, pagination).await?;
    Ok(Json(ClientPage {
        clients: page.items,
        total: page.total,
        offset: page.offset,
        limit: page.limit,
    }))
}
