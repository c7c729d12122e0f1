//! Connecting to the rentdesk store.
//!
//! The server talks to one SurrealDB namespace/database pair over plain
//! WebSocket. `url` may be given as `host:port` or `ws://host:port`.

use serde::Deserialize;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{Connection, Surreal};
use tracing::{info, warn};

use crate::error::DbError;

const WS_SCHEME: &str = "ws://";
const DEFAULT_CREDENTIAL: &str = "root";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "rentdesk".into(),
            database: "main".into(),
            username: DEFAULT_CREDENTIAL.into(),
            password: DEFAULT_CREDENTIAL.into(),
        }
    }
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl DbConfig {
    /// `url` without the `ws://` scheme or a trailing slash.
    pub fn endpoint(&self) -> &str {
        let url = self.url.trim();
        url.strip_prefix(WS_SCHEME).unwrap_or(url).trim_end_matches('/')
    }

    /// Still signing in with the stock `root`/`root` account.
    pub fn uses_default_credentials(&self) -> bool {
        self.username == DEFAULT_CREDENTIAL && self.password == DEFAULT_CREDENTIAL
    }

    pub fn validate(&self) -> Result<(), DbError> {
        let endpoint = self.endpoint();
        if endpoint.is_empty() {
            return Err(DbError::Config("database url is empty".into()));
        }
        if endpoint.contains("://") {
            return Err(DbError::Config(format!(
                "database url {:?} must be host:port or ws://host:port",
                self.url
            )));
        }
        for (name, value) in [("namespace", &self.namespace), ("database", &self.database)] {
            if !is_identifier(value) {
                return Err(DbError::Config(format!(
                    "database {name} {value:?} must be letters, digits or '_'"
                )));
            }
        }
        if self.username.trim().is_empty() {
            return Err(DbError::Config("database username is empty".into()));
        }
        Ok(())
    }
}

/// Owns the shared SurrealDB client handle.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Validate `config`, sign in and select the rentdesk namespace.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        config.validate()?;
        if config.uses_default_credentials() {
            warn!("Signing in to SurrealDB with the default root credentials");
        }

        let db = Surreal::new::<Ws>(config.endpoint()).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!(
            endpoint = config.endpoint(),
            namespace = %config.namespace,
            database = %config.database,
            "Connected to the rentdesk store"
        );
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}

/// Round trip to the store, used by the health endpoint.
pub async fn ping<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query("RETURN true")
        .await?
        .check()
        .map_err(|e| DbError::Query(e.to_string()))?;
    Ok(())
}
