//! Server configuration.
//!
//! Loaded from a YAML file, then overridden by `RENTDESK_*` environment
//! variables. Token secrets have no usable defaults; [`Config::validate`]
//! refuses to start without them.

use std::net::IpAddr;
use std::path::Path;

use rentdesk_auth::{AuthConfig, RateLimitConfig};
use rentdesk_db::DbConfig;
use serde::Deserialize;

const ENV_PREFIX: &str = "RENTDESK_";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DbConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::FileRead(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply `RENTDESK_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(host) = var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("SERVER_PORT") {
            self.server.port = parse_var("SERVER_PORT", &port)?;
        }
        if let Some(origins) = var("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(environment) = var("ENVIRONMENT") {
            self.server.environment = environment;
        }
        if let Some(url) = var("FRONTEND_URL") {
            self.server.frontend_url = Some(url);
        }

        if let Some(url) = var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(ns) = var("DATABASE_NAMESPACE") {
            self.database.namespace = ns;
        }
        if let Some(db) = var("DATABASE_NAME") {
            self.database.database = db;
        }
        if let Some(user) = var("DATABASE_USERNAME") {
            self.database.username = user;
        }
        if let Some(password) = var("DATABASE_PASSWORD") {
            self.database.password = password;
        }

        if let Some(secret) = var("ACCESS_TOKEN_SECRET") {
            self.auth.access_token_secret = secret;
        }
        if let Some(secret) = var("REFRESH_TOKEN_SECRET") {
            self.auth.refresh_token_secret = secret;
        }
        if let Some(secs) = var("ACCESS_TOKEN_LIFETIME_SECS") {
            self.auth.access_token_lifetime_secs = parse_var("ACCESS_TOKEN_LIFETIME_SECS", &secs)?;
        }
        if let Some(secs) = var("REFRESH_TOKEN_LIFETIME_SECS") {
            self.auth.refresh_token_lifetime_secs =
                parse_var("REFRESH_TOKEN_LIFETIME_SECS", &secs)?;
        }
        if let Some(factor) = var("PASSWORD_WORK_FACTOR") {
            self.auth.password_work_factor = parse_var("PASSWORD_WORK_FACTOR", &factor)?;
        }

        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = match format.as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "{ENV_PREFIX}LOG_FORMAT must be json or pretty, got {other:?}"
                    )));
                }
            };
        }

        Ok(())
    }

    /// Reject configurations the server must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let auth = &self.auth;
        if auth.access_token_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.access_token_secret is empty".into()));
        }
        if auth.refresh_token_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.refresh_token_secret is empty".into()));
        }
        if auth.access_token_secret == auth.refresh_token_secret {
            return Err(ConfigError::Invalid(
                "access and refresh token secrets must differ".into(),
            ));
        }
        if auth.access_token_lifetime_secs == 0 || auth.refresh_token_lifetime_secs == 0 {
            return Err(ConfigError::Invalid("token lifetimes must be positive".into()));
        }
        for (name, limit) in [
            ("general", &self.rate_limit.general),
            ("auth", &self.rate_limit.auth),
        ] {
            if limit.max_requests == 0 || limit.window_secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "rate_limit.{name} needs a positive budget and window"
                )));
            }
        }
        if self.server.host.trim().parse::<IpAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "server.host {:?} is not an IP address",
                self.server.host
            )));
        }
        self.database
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.server.is_production() && self.database.uses_default_credentials() {
            return Err(ConfigError::Invalid(
                "database credentials must be changed in production".into(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{ENV_PREFIX}{name}: cannot parse {value:?}")))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS. `*` allows any.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// `production` hides internal error detail from responses.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Base URL of the web frontend, used to build agency links.
    #[serde(default)]
    pub frontend_url: Option<String>,

    /// Largest accepted request body.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            environment: default_environment(),
            frontend_url: None,
            body_limit_bytes: default_body_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

/// Budgets for the general and the authentication limiter.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "RateLimitConfig::general")]
    pub general: RateLimitConfig,

    #[serde(default = "RateLimitConfig::auth")]
    pub auth: RateLimitConfig,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            general: RateLimitConfig::general(),
            auth: RateLimitConfig::auth(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> Config {
        let mut config = Config::default();
        config.auth.access_token_secret = "access".into();
        config.auth.refresh_token_secret = "refresh".into();
        config
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.rate_limit.general.max_requests, 100);
        assert_eq!(config.rate_limit.auth.max_requests, 20);
        assert_eq!(config.rate_limit.auth.window_secs, 900);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.server.is_production());
    }

    #[test]
    fn yaml_overrides_selected_fields() {
        let config = Config::from_yaml(
            r#"
server:
  port: 8080
  environment: production
  frontend_url: https://app.rentdesk.test
auth:
  access_token_secret: a
  refresh_token_secret: b
  access_token_lifetime_secs: 900
database:
  url: ws://db.internal:8000
  username: rentdesk
  password: s3cret
rate_limit:
  auth:
    max_requests: 5
    window_secs: 60
logging:
  format: pretty
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.server.is_production());
        assert_eq!(config.auth.access_token_lifetime_secs, 900);
        assert_eq!(config.auth.refresh_token_lifetime_secs, 2_592_000);
        assert_eq!(config.rate_limit.auth.max_requests, 5);
        assert_eq!(config.rate_limit.general.max_requests, 100);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = Config::from_yaml("server: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn environment_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("RENTDESK_SERVER_PORT", "9000"),
            ("RENTDESK_ALLOWED_ORIGINS", "https://a.test, https://b.test,"),
            ("RENTDESK_ACCESS_TOKEN_SECRET", "from-env"),
            ("RENTDESK_DATABASE_URL", "db:8000"),
            ("RENTDESK_LOG_FORMAT", "pretty"),
        ]);
        let mut config = Config::default();
        config
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.server.allowed_origins,
            vec!["https://a.test", "https://b.test"]
        );
        assert_eq!(config.auth.access_token_secret, "from-env");
        assert_eq!(config.database.url, "db:8000");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn bad_environment_values_are_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env_with(|key| (key == "RENTDESK_SERVER_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn secrets_must_be_set_and_distinct() {
        assert!(valid().validate().is_ok());

        let mut missing = valid();
        missing.auth.refresh_token_secret = "  ".into();
        assert!(missing.validate().is_err());

        let mut shared = valid();
        shared.auth.refresh_token_secret = "access".into();
        assert!(shared.validate().is_err());

        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn host_must_be_an_ip_address() {
        let mut config = valid();
        config.server.host = "127.0.0.1".into();
        assert!(config.validate().is_ok());

        config.server.host = "0.0.0.O".into();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("server.host")));
    }

    #[test]
    fn database_settings_are_checked() {
        let mut config = valid();
        config.database.url = "http://db:8000".into();
        assert!(config.validate().is_err());

        let mut production = valid();
        production.server.environment = "production".into();
        assert!(production.validate().is_err());
        production.database.password = "s3cret".into();
        assert!(production.validate().is_ok());
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let mut config = valid();
        config.rate_limit.general.max_requests = 0;
        assert!(config.validate().is_err());
    }
}
