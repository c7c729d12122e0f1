//! HTTP error envelope.
//!
//! Every failure leaves the server as
//! `{"error": {"message", "code", "status", "timestamp", "path"?, "method"?}}`.
//! Server faults carry a fixed message; the underlying error is only logged.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Json, OriginalUri, Request};
use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use rentdesk_auth::AuthError;
use rentdesk_core::error::RentdeskError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::error;

/// Fault codes for 5xx responses, one per failing operation family.
pub mod fault {
    pub const AUTH: &str = "AUTH_ERROR";
    pub const LOGIN: &str = "LOGIN_ERROR";
    pub const REGISTRATION: &str = "REGISTRATION_ERROR";
    pub const INTERNAL: &str = "INTERNAL_ERROR";
}

#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    retry_after: Option<u64>,
    path: Option<String>,
    method: Option<String>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    error: Body<'a>,
}

#[derive(Serialize)]
struct Body<'a> {
    message: &'a str,
    code: &'a str,
    status: u16,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<&'a str>,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retry_after: None,
            path: None,
            method: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn route_not_found() -> Self {
        Self::not_found("NOT_FOUND", "Route not found")
    }

    /// A 500 whose detail stays in the log.
    pub fn internal(code: &'static str, cause: &dyn std::fmt::Display) -> Self {
        error!(code, error = %cause, "Request failed");
        let message = match code {
            fault::AUTH => "Authentication failed",
            fault::LOGIN => "Login failed",
            fault::REGISTRATION => "Registration failed",
            _ => "Internal server error",
        };
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    /// Map an authentication failure; `fault_code` labels server faults.
    pub fn from_auth(err: AuthError, fault_code: &'static str) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::new(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials",
            ),
            AuthError::TokenExpired | AuthError::TokenInvalid(_) => Self::new(
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Invalid or expired token",
            ),
            AuthError::MissingToken => Self::new(
                StatusCode::UNAUTHORIZED,
                "MISSING_TOKEN",
                "Access token required",
            ),
            AuthError::NotAuthenticated => Self::new(
                StatusCode::UNAUTHORIZED,
                "NOT_AUTHENTICATED",
                "Authentication required",
            ),
            AuthError::Forbidden => Self::new(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Insufficient permissions",
            ),
            AuthError::MissingTenantSlug => Self::new(
                StatusCode::BAD_REQUEST,
                "MISSING_TENANT_SLUG",
                "Agency slug is required for client login",
            ),
            AuthError::MissingRefreshToken => Self::new(
                StatusCode::BAD_REQUEST,
                "MISSING_REFRESH_TOKEN",
                "Refresh token required",
            ),
            AuthError::EmailExists => {
                Self::new(StatusCode::CONFLICT, "EMAIL_EXISTS", "Email already registered")
            }
            AuthError::SlugExists => {
                Self::new(StatusCode::CONFLICT, "SLUG_EXISTS", "Agency slug already taken")
            }
            AuthError::AgencyNotFound => Self::not_found("AGENCY_NOT_FOUND", "Agency not found"),
            AuthError::Validation(message) => Self::validation(message),
            AuthError::RateLimited { retry_after_secs } => {
                let mut err = Self::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMIT_EXCEEDED",
                    "Too many requests, please try again later",
                );
                err.retry_after = Some(retry_after_secs);
                err
            }
            AuthError::Store(inner) => Self::from_store(inner, fault_code),
            err @ AuthError::Crypto(_) => Self::internal(fault_code, &err),
        }
    }

    /// Map a storage failure; `fault_code` labels server faults.
    pub fn from_store(err: RentdeskError, fault_code: &'static str) -> Self {
        match err {
            RentdeskError::NotFound { entity, .. } if entity == "agency" => {
                Self::not_found("AGENCY_NOT_FOUND", "Agency not found")
            }
            RentdeskError::NotFound { entity, .. } => {
                Self::not_found("NOT_FOUND", format!("{entity} not found"))
            }
            RentdeskError::AlreadyExists { entity, field } => Self::new(
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("{entity} with this {field} already exists"),
            ),
            RentdeskError::Validation { message } => Self::validation(message),
            other => Self::internal(fault_code, &other),
        }
    }

    /// Record where the failing request was going.
    pub fn at(mut self, method: &Method, uri: &Uri) -> Self {
        self.method = Some(method.to_string());
        self.path = Some(uri.path().to_string());
        self
    }

    /// Record the method and full path of `request`.
    pub fn at_request<B>(self, request: &axum::http::Request<B>) -> Self {
        self.at(request.method(), original_uri(request))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::from_auth(err, fault::AUTH)
    }
}

impl From<RentdeskError> for ApiError {
    fn from(err: RentdeskError) -> Self {
        Self::from_store(err, fault::INTERNAL)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            error: Body {
                message: &self.message,
                code: self.code,
                status: self.status.as_u16(),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                path: self.path.as_deref(),
                method: self.method.as_deref(),
                retry_after: self.retry_after,
            },
        };

        let mut response = (self.status, axum::Json(envelope)).into_response();
        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// The URI as the client sent it; nested routers strip their prefix from
/// `Request::uri`.
pub fn original_uri<B>(request: &axum::http::Request<B>) -> &Uri {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri)
        .unwrap_or_else(|| request.uri())
}

/// `Json` whose rejections use the error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let uri = original_uri(&req).clone();
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection).at(&method, &uri)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "VALIDATION_ERROR",
            "Expected a JSON request body",
        ),
        other => ApiError::validation(other.body_text()),
    }
}
