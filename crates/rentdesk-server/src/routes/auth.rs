//! `/api/v1/auth`: login, registration, refresh and the current principal.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use rentdesk_auth::service::AuthOutput;
use rentdesk_auth::{AgencySummary, LoginInput, RegisterAgencyInput, RegisterClientInput};
use rentdesk_core::models::principal::{Principal, PrincipalKind, PrincipalRecord};
use serde::{Deserialize, Serialize};
use surrealdb::Connection;

use super::activity;
use crate::error::{ApiError, ApiResult, ValidJson, fault};
use crate::middleware::{RateLimitGate, authenticate, rate_limit, record_activity};
use crate::state::AppState;

pub fn router<C: Connection>(state: &AppState<C>) -> Router<AppState<C>> {
    let gate = RateLimitGate {
        limiter: state.auth_limiter.clone(),
        scope: "auth",
    };
    let recorder = &state.activity;

    let public = Router::new()
        .route(
            "/login",
            post(login::<C>).layer(from_fn_with_state(
                activity(recorder, "login", None),
                record_activity,
            )),
        )
        .route(
            "/register/agency",
            post(register_agency::<C>).layer(from_fn_with_state(
                activity(recorder, "register_agency", Some("agency")),
                record_activity,
            )),
        )
        .route(
            "/register/client/:tenant_slug",
            post(register_client::<C>).layer(from_fn_with_state(
                activity(recorder, "register_client", Some("client")),
                record_activity,
            )),
        )
        .route("/refresh", post(refresh::<C>))
        .layer(from_fn_with_state(gate, rate_limit));

    let session = Router::new()
        .route("/me", get(me))
        .route_layer(from_fn_with_state(state.clone(), authenticate::<C>));

    public.merge(session)
}

/// Body of a successful login or registration.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: &'static str,
    pub principal_kind: PrincipalKind,
    /// Stored record without its password hash.
    pub principal: PrincipalRecord,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    /// Agency a client registered with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency: Option<AgencySummary>,
    /// Frontend address of a newly registered agency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_url: Option<String>,
}

impl SessionResponse {
    fn new(message: &'static str, output: AuthOutput) -> Self {
        Self {
            message,
            principal_kind: output.principal.kind(),
            principal: output.principal,
            access_token: output.access_token,
            refresh_token: output.refresh_token,
            expires_in: output.expires_in,
            agency: None,
            agency_url: None,
        }
    }

    /// Respond with `status`, exposing the principal to outer layers.
    fn into_response_with(self, status: StatusCode) -> Response {
        let principal = self.principal.principal();
        (status, Extension(principal), Json(self)).into_response()
    }
}

async fn login<C: Connection>(
    State(state): State<AppState<C>>,
    ValidJson(input): ValidJson<LoginInput>,
) -> ApiResult<Response> {
    let output = state
        .auth
        .login(input)
        .await
        .map_err(|e| ApiError::from_auth(e, fault::LOGIN))?;

    Ok(SessionResponse::new("Login successful", output).into_response_with(StatusCode::OK))
}

async fn register_agency<C: Connection>(
    State(state): State<AppState<C>>,
    ValidJson(input): ValidJson<RegisterAgencyInput>,
) -> ApiResult<Response> {
    let output = state
        .auth
        .register_agency(input)
        .await
        .map_err(|e| ApiError::from_auth(e, fault::REGISTRATION))?;

    let mut body = SessionResponse::new("Agency registered successfully", output);
    if let (Some(base), PrincipalRecord::Agency(agency)) =
        (&state.config.server.frontend_url, &body.principal)
    {
        body.agency_url = Some(format!("{}/{}", base.trim_end_matches('/'), agency.slug));
    }
    Ok(body.into_response_with(StatusCode::CREATED))
}

async fn register_client<C: Connection>(
    State(state): State<AppState<C>>,
    Path(tenant_slug): Path<String>,
    ValidJson(input): ValidJson<RegisterClientInput>,
) -> ApiResult<Response> {
    let registration = state
        .auth
        .register_client(&tenant_slug, input)
        .await
        .map_err(|e| ApiError::from_auth(e, fault::REGISTRATION))?;

    let mut body = SessionResponse::new("Client registered successfully", registration.output);
    body.agency = Some(registration.agency);
    Ok(body.into_response_with(StatusCode::CREATED))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

async fn refresh<C: Connection>(
    State(state): State<AppState<C>>,
    ValidJson(request): ValidJson<RefreshRequest>,
) -> ApiResult<Response> {
    let token = request.refresh_token.unwrap_or_default();
    match state.auth.refresh(&token).await {
        Ok(output) => Ok(Json(output).into_response()),
        Err(e) if e.is_token_failure() => Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "INVALID_REFRESH_TOKEN",
            "Invalid refresh token",
        )),
        Err(e) => Err(ApiError::from_auth(e, fault::AUTH)),
    }
}

#[derive(Debug, Serialize)]
struct MeResponse {
    principal_kind: PrincipalKind,
    principal: Principal,
}

async fn me(Extension(principal): Extension<Principal>) -> Json<MeResponse> {
    Json(MeResponse {
        principal_kind: principal.kind,
        principal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentdesk_auth::AuthError;

    #[test]
    fn refresh_request_tolerates_missing_token() {
        let request: RefreshRequest = serde_json::from_str("{}").unwrap();
        assert!(request.refresh_token.is_none());
    }

    #[test]
    fn missing_refresh_token_is_a_client_error() {
        let api = ApiError::from(AuthError::MissingRefreshToken);
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
    }
}
