//! `/api/v1/agencies`: an agency's own profile and branding, plus the
//! public agency card.

use axum::extract::{Path, State};
use axum::middleware::from_fn_with_state;
use axum::response::Json;
use axum::routing::{get, put};
use axum::{Extension, Router};
use rentdesk_auth::{AgencySummary, RoleGuard, validate_email};
use rentdesk_core::models::agency::{
    Agency, AgencySettings, UpdateAgency, UpdateAgencySettings, is_hex_color,
};
use rentdesk_core::models::principal::Principal;
use rentdesk_core::repository::AgencyRepository;
use serde::Serialize;
use surrealdb::Connection;
use tracing::info;

use super::activity;
use crate::error::{ApiError, ApiResult, ValidJson};
use crate::middleware::{authenticate, enforce_tenant_isolation, record_activity, require_kinds};
use crate::state::AppState;

pub fn router<C: Connection>(state: &AppState<C>) -> Router<AppState<C>> {
    let body_limit = state.config.server.body_limit_bytes;

    let own = Router::new()
        .route(
            "/profile",
            get(get_profile::<C>).merge(
                put(update_profile::<C>)
                    .layer(from_fn_with_state(
                        activity(&state.activity, "update_agency_profile", Some("agency")),
                        record_activity,
                    ))
                    .layer(from_fn_with_state(body_limit, enforce_tenant_isolation)),
            ),
        )
        .route(
            "/settings",
            get(get_settings::<C>).merge(
                put(update_settings::<C>)
                    .layer(from_fn_with_state(
                        activity(
                            &state.activity,
                            "update_agency_settings",
                            Some("agency_settings"),
                        ),
                        record_activity,
                    ))
                    .layer(from_fn_with_state(body_limit, enforce_tenant_isolation)),
            ),
        )
        .route_layer(from_fn_with_state(RoleGuard::agency_only(), require_kinds))
        .route_layer(from_fn_with_state(state.clone(), authenticate::<C>));

    Router::new()
        .route("/public/:slug", get(public_card::<C>))
        .merge(own)
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    agency: Agency,
    settings: AgencySettings,
    car_categories: Vec<String>,
}

async fn get_profile<C: Connection>(
    State(state): State<AppState<C>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<ProfileResponse>> {
    let agencies = state.auth.agencies();
    let agency = agencies.get_by_id(principal.id).await?;
    let settings = agencies.get_settings(agency.id).await?;
    let car_categories = agencies.list_category_names(agency.id).await?;

    Ok(Json(ProfileResponse {
        agency,
        settings,
        car_categories,
    }))
}

#[derive(Debug, Serialize)]
struct UpdatedResponse {
    message: &'static str,
    agency: Agency,
}

fn validate_update(input: &UpdateAgency) -> Result<(), ApiError> {
    if input.is_empty() {
        return Err(ApiError::validation("no profile fields to update"));
    }
    if let Some(name) = &input.name {
        let len = name.trim().chars().count();
        if !(2..=255).contains(&len) {
            return Err(ApiError::validation(
                "name must be between 2 and 255 characters",
            ));
        }
    }
    if let Some(website) = &input.website {
        if !(website.starts_with("http://") || website.starts_with("https://")) {
            return Err(ApiError::validation("website must be an http(s) URL"));
        }
    }
    Ok(())
}

/// Update the caller's own agency. The target is always the
/// authenticated agency, never an id from the body.
async fn update_profile<C: Connection>(
    State(state): State<AppState<C>>,
    Extension(principal): Extension<Principal>,
    ValidJson(mut input): ValidJson<UpdateAgency>,
) -> ApiResult<Json<UpdatedResponse>> {
    validate_update(&input)?;
    if let Some(name) = input.name.as_mut() {
        *name = name.trim().to_string();
    }

    let agency = state
        .auth
        .agencies()
        .update_profile(principal.id, input)
        .await?;
    info!(agency_id = %agency.id, "Agency profile updated");

    Ok(Json(UpdatedResponse {
        message: "Agency profile updated successfully",
        agency,
    }))
}

async fn get_settings<C: Connection>(
    State(state): State<AppState<C>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<AgencySettings>> {
    let settings = state.auth.agencies().get_settings(principal.id).await?;
    Ok(Json(settings))
}

#[derive(Debug, Serialize)]
struct SettingsUpdatedResponse {
    message: &'static str,
    settings: AgencySettings,
}

fn validate_settings(input: &UpdateAgencySettings) -> Result<(), ApiError> {
    if input.is_empty() {
        return Err(ApiError::validation("no settings fields to update"));
    }
    for (field, color) in [
        ("primary_color", &input.primary_color),
        ("secondary_color", &input.secondary_color),
    ] {
        if let Some(color) = color {
            if !is_hex_color(color) {
                return Err(ApiError::validation(format!(
                    "{field} must be a hex color like #3B82F6"
                )));
            }
        }
    }
    if let Some(font) = &input.font_family {
        let len = font.trim().chars().count();
        if !(1..=100).contains(&len) {
            return Err(ApiError::validation(
                "font_family must be between 1 and 100 characters",
            ));
        }
    }
    if let Some(logo) = &input.logo_url {
        if !(logo.starts_with("http://") || logo.starts_with("https://")) {
            return Err(ApiError::validation("logo_url must be an http(s) URL"));
        }
    }
    if let Some(email) = &input.contact_email {
        validate_email(email.trim())
            .map_err(|_| ApiError::validation("contact_email must be a valid address"))?;
    }
    Ok(())
}

/// Update the caller's own branding and legal copy.
async fn update_settings<C: Connection>(
    State(state): State<AppState<C>>,
    Extension(principal): Extension<Principal>,
    ValidJson(mut input): ValidJson<UpdateAgencySettings>,
) -> ApiResult<Json<SettingsUpdatedResponse>> {
    validate_settings(&input)?;
    if let Some(font) = input.font_family.as_mut() {
        *font = font.trim().to_string();
    }
    if let Some(email) = input.contact_email.as_mut() {
        *email = rentdesk_auth::normalize_email(email);
    }

    let settings = state
        .auth
        .agencies()
        .update_settings(principal.id, input)
        .await?;
    info!(agency_id = %principal.id, "Agency settings updated");

    Ok(Json(SettingsUpdatedResponse {
        message: "Agency settings updated successfully",
        settings,
    }))
}

#[derive(Debug, Serialize)]
struct PublicCard {
    agency: AgencySummary,
    branding: Branding,
}

#[derive(Debug, Serialize)]
struct Branding {
    primary_color: String,
    secondary_color: String,
    font_family: String,
}

/// What a prospective client sees before signing up with an agency.
async fn public_card<C: Connection>(
    State(state): State<AppState<C>>,
    Path(slug): Path<String>,
) -> ApiResult<Json<PublicCard>> {
    let agencies = state.auth.agencies();
    let agency = agencies.get_active_by_slug(slug.trim()).await?;
    let settings = agencies.get_settings(agency.id).await?;

    Ok(Json(PublicCard {
        agency: AgencySummary::from(&agency),
        branding: Branding {
            primary_color: settings.primary_color,
            secondary_color: settings.secondary_color,
            font_family: settings.font_family,
        },
    }))
}
