//! rentdesk HTTP server.
//!
//! Wires the authentication core ([`rentdesk_auth`]) and the SurrealDB
//! store ([`rentdesk_db`]) into an axum application.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use routes::build_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use rentdesk_auth::AuthError;
use surrealdb::Connection;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{ConfigError, ServerConfig};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(String),

    #[error("server error: {0}")]
    Serve(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("authentication setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("database error: {0}")]
    Database(String),

    #[error("telemetry setup failed: {0}")]
    Telemetry(String),
}

/// CORS policy for `origins`. A lone `*` allows any origin without
/// credentials; an explicit list allows credentials.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, ServerError> {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o.trim() == "*") {
        return Ok(base.allow_origin(AllowOrigin::any()));
    }

    let origins = origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| ConfigError::Invalid(format!("CORS origin {o:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(base
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}

/// The application router with tracing and CORS applied.
pub fn build_app<C: Connection>(state: AppState<C>) -> Result<Router, ServerError> {
    let cors = cors_layer(&state.config.server.allowed_origins)?;
    Ok(build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

pub struct Server {
    config: ServerConfig,
    app: Router,
}

impl Server {
    pub fn new(config: ServerConfig, app: Router) -> Self {
        Self { config, app }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ServerError> {
        let host = self.config.host.trim();
        let ip = host
            .parse()
            .map_err(|_| ServerError::Bind(format!("server.host {host:?} is not an IP address")))?;
        Ok(SocketAddr::new(ip, self.config.port))
    }

    /// Serve until `shutdown` resolves.
    pub async fn run(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{addr}: {e}")))?;

        info!(%addr, "Server listening");

        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;

        info!("Server shutdown complete");
        Ok(())
    }
}
