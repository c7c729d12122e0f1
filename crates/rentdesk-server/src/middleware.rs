//! Request middleware: authentication, role guards, tenant isolation, rate
//! limiting and activity recording.
//!
//! Each function is mounted with `axum::middleware::from_fn_with_state`.
//! Authentication attaches the resolved [`Principal`] to the request and
//! to the response extensions, so both inner and outer layers can see it.

use std::net::SocketAddr;

use axum::body::{Body, to_bytes};
use axum::extract::{ConnectInfo, Query, RawPathParams, Request, State};
use axum::http::{HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use rentdesk_auth::tenant::{self, TENANT_FIELD, TenantScope};
use rentdesk_auth::{ActivityRecorder, AuthError, RateLimiter, RoleGuard};
use rentdesk_core::models::activity::ActivityLogEntry;
use rentdesk_core::models::principal::Principal;
use serde_json::{Value, json};
use surrealdb::Connection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, fault, original_uri};
use crate::state::AppState;

/// Resolve `Authorization: Bearer <token>` to an active principal.
pub async fn authenticate<C: Connection>(
    State(state): State<AppState<C>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return Err(ApiError::from_auth(AuthError::MissingToken, fault::AUTH).at_request(&request));
    };

    let principal = match state.auth.authenticate(token).await {
        Ok(principal) => principal,
        Err(err) => {
            debug!(error = %err, "Bearer token rejected");
            return Err(ApiError::from_auth(err, fault::AUTH).at_request(&request));
        }
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    Ok(response)
}

/// Admit only the principal kinds `guard` allows.
pub async fn require_kinds(
    State(guard): State<RoleGuard>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(err) = guard.check(request.extensions().get::<Principal>()) {
        return Err(ApiError::from_auth(err, fault::AUTH).at_request(&request));
    }
    Ok(next.run(request).await)
}

/// Query parameters after tenant isolation ran.
///
/// For agency and client principals the tenant field holds exactly their
/// own tenant id, whatever the caller sent.
#[derive(Debug, Clone, Default)]
pub struct ScopedQuery(pub Vec<(String, String)>);

impl ScopedQuery {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The effective tenant filter, if any.
    pub fn tenant_id(&self) -> Result<Option<Uuid>, ApiError> {
        match self.get(TENANT_FIELD).map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|_| ApiError::validation(format!("{TENANT_FIELD} must be a UUID"))),
        }
    }
}

/// Pin reads and writes of agency and client principals to their tenant.
///
/// Read methods get a [`ScopedQuery`] extension; JSON bodies of write
/// methods are rewritten in place. Platform admin writes are forwarded
/// untouched. `body_limit` bounds the buffered body.
pub async fn enforce_tenant_isolation(
    State(body_limit): State<usize>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let method = request.method().clone();
    let uri = original_uri(&request).clone();
    let fail = |err: ApiError| err.at(&method, &uri);

    let Some(principal) = request.extensions().get::<Principal>().cloned() else {
        return Err(fail(ApiError::from(AuthError::NotAuthenticated)));
    };
    let scope = tenant::scope_for(&principal).map_err(|e| fail(e.into()))?;
    let writes = method == Method::POST || method == Method::PUT || method == Method::PATCH;

    if writes && scope == TenantScope::Unrestricted {
        return Ok(next.run(request).await);
    }

    if writes {
        let (mut parts, body) = request.into_parts();
        let bytes = to_bytes(body, body_limit)
            .await
            .map_err(|_| fail(ApiError::validation("request body too large or unreadable")))?;

        let mut value = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| fail(ApiError::validation(format!("invalid JSON body: {e}"))))?
        };
        tenant::enforce_on_body(&principal, &mut value).map_err(|e| fail(e.into()))?;

        let rewritten = serde_json::to_vec(&value)
            .map_err(|e| fail(ApiError::internal(fault::INTERNAL, &e)))?;
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(rewritten.len()));
        let request = Request::from_parts(parts, Body::from(rewritten));
        return Ok(next.run(request).await);
    }

    let mut params = Query::<Vec<(String, String)>>::try_from_uri(request.uri())
        .map(|Query(params)| params)
        .map_err(|e| fail(ApiError::validation(e.body_text())))?;
    tenant::enforce_on_query(&principal, &mut params).map_err(|e| fail(e.into()))?;

    let mut request = request;
    request.extensions_mut().insert(ScopedQuery(params));
    Ok(next.run(request).await)
}

fn client_address(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// One rate limiter with the key prefix it counts under.
#[derive(Clone)]
pub struct RateLimitGate {
    pub limiter: RateLimiter,
    pub scope: &'static str,
}

/// Count the request against the caller's address.
pub async fn rate_limit(
    State(gate): State<RateLimitGate>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let address = client_address(&request).unwrap_or_else(|| "unknown".to_string());
    let key = format!("{}:{address}", gate.scope);

    if let Err(err) = gate.limiter.check(&key).await {
        return Err(ApiError::from_auth(err, fault::INTERNAL).at_request(&request));
    }
    Ok(next.run(request).await)
}

/// What to record for a route.
#[derive(Clone)]
pub struct ActivityTag {
    pub recorder: ActivityRecorder,
    pub action: &'static str,
    pub entity_type: Option<&'static str>,
}

/// Path parameter naming the entity a route acts on.
const ENTITY_ID_PARAM: &str = "id";

/// Record the request as an activity entry, whatever its outcome.
///
/// The principal comes from the request, or from the response for routes
/// that establish it (login, registration); those only carry one when
/// they succeed. Request bodies are never copied into the entry.
pub async fn record_activity(
    State(tag): State<ActivityTag>,
    path_params: Option<RawPathParams>,
    request: Request,
    next: Next,
) -> Response {
    let caller = request.extensions().get::<Principal>().cloned();
    let entity_id = path_params.and_then(|params| {
        params
            .iter()
            .find(|(key, _)| *key == ENTITY_ID_PARAM)
            .map(|(_, value)| value.to_string())
    });
    let address = client_address(&request);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let method = request.method().to_string();
    let uri = original_uri(&request);
    let path = uri.path().to_string();
    let query = uri.query().map(str::to_string);

    let response = next.run(request).await;

    let principal = caller.or_else(|| response.extensions().get::<Principal>().cloned());
    if let Some(principal) = principal {
        let mut entry = ActivityLogEntry::new(&principal, tag.action, tag.entity_type)
            .with_source(address, user_agent)
            .with_metadata(json!({
                "method": method,
                "path": path,
                "query": query,
                "status": response.status().as_u16(),
            }));
        entry.entity_id = entity_id;
        tag.recorder.record(entry);
    }
    response
}
