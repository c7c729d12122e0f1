//! rentdesk - multi-tenant car-rental backend.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rentdesk_auth::InMemoryRateLimitStore;
use rentdesk_auth::service::CreateAdminInput;
use rentdesk_db::DbManager;
use rentdesk_server::config::Config;
use rentdesk_server::state::AppState;
use rentdesk_server::{Server, build_app, telemetry};
use tokio::signal;
use tracing::{debug, info, warn};

/// How often finished rate-limit windows are dropped.
const RATE_LIMIT_PURGE_INTERVAL: Duration = Duration::from_secs(60);
const ACTIVITY_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "rentdesk")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "RENTDESK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Create a platform admin account
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long, env = "RENTDESK_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long, default_value = "Platform")]
        first_name: String,

        #[arg(long, default_value = "Admin")]
        last_name: String,

        #[arg(long, default_value = "super_admin")]
        role: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;
    config.validate().context("invalid configuration")?;

    telemetry::init_tracing(&config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting rentdesk");

    let manager = DbManager::connect(&config.database)
        .await
        .context("failed to connect to SurrealDB")?;
    let db = manager.client().clone();
    let report = rentdesk_db::run_migrations(&db)
        .await
        .context("failed to run migrations")?;
    info!(
        schema_version = report.schema_version,
        applied = report.applied.len(),
        "Database ready"
    );

    let rate_store = Arc::new(InMemoryRateLimitStore::new());
    let server_config = config.server.clone();
    let (state, activity_writer) = AppState::build(db, config, rate_store.clone())?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let purge = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(RATE_LIMIT_PURGE_INTERVAL);
                loop {
                    ticker.tick().await;
                    let removed = rate_store.purge_expired(Utc::now());
                    if removed > 0 {
                        debug!(removed, "Purged finished rate-limit windows");
                    }
                }
            });

            let app = build_app(state)?;
            info!(
                host = %server_config.host,
                port = %server_config.port,
                "Starting HTTP server"
            );
            Server::new(server_config, app).run(shutdown_signal()).await?;
            purge.abort();
        }
        Command::CreateAdmin {
            email,
            password,
            first_name,
            last_name,
            role,
        } => {
            let admin = state
                .auth
                .create_platform_admin(CreateAdminInput {
                    email,
                    password,
                    first_name,
                    last_name,
                    role,
                })
                .await
                .context("failed to create platform admin")?;
            info!(admin_id = %admin.id, email = %admin.email, "Platform admin created");
            drop(state);
        }
    }

    // The writer exits once every recorder handle is gone.
    if tokio::time::timeout(ACTIVITY_DRAIN_TIMEOUT, activity_writer)
        .await
        .is_err()
    {
        warn!("Activity writer did not drain before shutdown");
    }
    info!("rentdesk shutdown complete");
    Ok(())
}

/// File configuration (if given) with environment overrides on top.
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Tracing is not initialized yet.
            eprintln!("Loading configuration from {}", path.display());
            let mut config = Config::from_file(path)?;
            config.apply_env()?;
            Ok(config)
        }
        None => {
            eprintln!("Loading configuration from environment variables");
            Ok(Config::from_env()?)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
