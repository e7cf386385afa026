//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)
//!
//! Environment variables use the `OAUTH_BACKEND__SECTION__KEY` form. The flat
//! names used by existing deployments (`DB_HOST`, `GITHUB_CLIENT_ID`, ...) are
//! accepted as aliases when the prefixed variable is not set.

use serde::Deserialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::AppError;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "OAUTH_BACKEND";

/// Flat environment variable names mapped to their prefixed equivalents
const ENV_ALIASES: &[(&str, &str)] = &[
    ("DB_HOST", "DATABASE__HOST"),
    ("DB_PORT", "DATABASE__PORT"),
    ("DB_USER", "DATABASE__USER"),
    ("DB_PASSWORD", "DATABASE__PASSWORD"),
    ("DB_NAME", "DATABASE__NAME"),
    ("DB_SSLMODE", "DATABASE__SSLMODE"),
    ("GITHUB_CLIENT_ID", "OAUTH__CLIENT_ID"),
    ("GITHUB_CLIENT_SECRET", "OAUTH__CLIENT_SECRET"),
    ("GITHUB_REDIRECT_URL", "OAUTH__REDIRECT_URL"),
    ("FRONTEND_URL", "SERVER__FRONTEND_URL"),
    ("BACKEND_PORT", "SERVER__PORT"),
    ("ENV", "SERVER__ENVIRONMENT"),
    ("COOKIE_DOMAIN", "SESSION__COOKIE_DOMAIN"),
    ("COOKIE_SECURE", "SESSION__COOKIE_SECURE"),
    ("COOKIE_SAMESITE", "SESSION__COOKIE_SAME_SITE"),
];

/// Upper bound for `session.lifetime_seconds` (ten years)
const MAX_SESSION_LIFETIME_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

const POSTGRES_SSL_MODES: &[&str] = &[
    "disable",
    "allow",
    "prefer",
    "require",
    "verify-ca",
    "verify-full",
];

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub oauth: OAuthConfig,
    pub github: GitHubApiConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Deployment environment; CORS is only enabled in development
    pub environment: DeploymentEnvironment,
    /// Frontend base URL (e.g., "http://127.0.0.1:3000")
    pub frontend_url: String,
    /// Route GET /metrics
    #[serde(default)]
    pub metrics_enabled: bool,
}

impl ServerConfig {
    /// Frontend origin without a trailing slash
    pub fn frontend_origin(&self) -> &str {
        self.frontend_url.trim_end_matches('/')
    }

    /// Where the browser lands after a successful login
    pub fn post_login_redirect(&self) -> String {
        format!("{}/profile", self.frontend_origin())
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentEnvironment {
    #[default]
    Development,
    Production,
}

/// PostgreSQL connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Required, never defaulted
    pub password: String,
    pub name: String,
    /// libpq sslmode (disable, allow, prefer, require, verify-ca, verify-full)
    pub sslmode: String,
    /// Pool size
    pub max_connections: u32,
    /// Connection attempts before startup fails
    pub connect_retries: u32,
    /// Delay between connection attempts in seconds
    pub connect_retry_delay_seconds: u64,
    /// Directory holding `*.up.sql` migration files
    pub migrations_dir: PathBuf,
}

/// OAuth client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with the provider
    pub redirect_url: String,
    /// Provider authorization endpoint
    pub authorize_url: String,
    /// Provider token endpoint
    pub token_url: String,
    /// Requested scopes
    pub scopes: Vec<String>,
}

/// GitHub REST API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubApiConfig {
    /// API base URL (e.g., "https://api.github.com")
    pub api_base_url: String,
    /// Outbound request timeout in seconds
    pub timeout_seconds: u64,
    pub user_agent: String,
}

/// Session cookie and store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Cookie `Domain` attribute; omitted when unset
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSitePolicy,
    /// Absolute session lifetime in seconds (default: 1 year)
    pub lifetime_seconds: i64,
    /// Expired-session sweep interval in seconds
    pub cleanup_interval_seconds: u64,
}

/// Cookie `SameSite` attribute
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from files and the process environment
    ///
    /// # Errors
    /// Returns error if a required value is missing or invalid
    pub fn load() -> Result<Self, AppError> {
        Self::load_from_env(utf8_env(std::env::vars_os()))
    }

    /// Load configuration using `env` in place of the process environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. `OAUTH_BACKEND__*` variables, then flat aliases
    pub fn load_from_env(env: HashMap<String, String>) -> Result<Self, AppError> {
        use config::{Config, Environment, File};

        let mut env = normalize_env(env);
        let scopes = env
            .remove(&format!("{ENV_PREFIX}__OAUTH__SCOPES"))
            .map(|raw| parse_scope_list(&raw));

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.environment", "development")?
            .set_default("server.metrics_enabled", false)?
            .set_default("database.host", "127.0.0.1")?
            .set_default("database.port", 5432)?
            .set_default("database.user", "postgres")?
            .set_default("database.name", "github_oauth_app")?
            .set_default("database.sslmode", "disable")?
            .set_default("database.max_connections", 10)?
            .set_default("database.connect_retries", 30)?
            .set_default("database.connect_retry_delay_seconds", 2)?
            .set_default("database.migrations_dir", "migrations")?
            .set_default(
                "oauth.authorize_url",
                "https://github.com/login/oauth/authorize",
            )?
            .set_default(
                "oauth.token_url",
                "https://github.com/login/oauth/access_token",
            )?
            .set_default("oauth.scopes", vec!["read:user", "user:email"])?
            .set_default("github.api_base_url", "https://api.github.com")?
            .set_default("github.timeout_seconds", 30)?
            .set_default(
                "github.user_agent",
                concat!("github-oauth-backend/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("session.cookie_name", "session_id")?
            .set_default("session.cookie_secure", false)?
            .set_default("session.cookie_same_site", "lax")?
            .set_default("session.lifetime_seconds", 365 * 24 * 60 * 60)?
            .set_default("session.cleanup_interval_seconds", 30 * 60)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .source(Some(env.into_iter().collect())),
            )
            .set_override_option("oauth.scopes", scopes)?
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), AppError> {
        require_non_empty("oauth.client_id", &self.oauth.client_id)?;
        require_non_empty("oauth.client_secret", &self.oauth.client_secret)?;
        require_non_empty("oauth.redirect_url", &self.oauth.redirect_url)?;
        require_non_empty("server.frontend_url", &self.server.frontend_url)?;
        require_non_empty("database.password", &self.database.password)?;

        require_http_url("oauth.redirect_url", &self.oauth.redirect_url)?;
        require_http_url("oauth.authorize_url", &self.oauth.authorize_url)?;
        require_http_url("oauth.token_url", &self.oauth.token_url)?;
        require_http_url("server.frontend_url", &self.server.frontend_url)?;
        require_http_url("github.api_base_url", &self.github.api_base_url)?;

        if self.oauth.scopes.is_empty()
            || self.oauth.scopes.iter().any(|scope| scope.trim().is_empty())
        {
            return Err(AppError::Config(
                "oauth.scopes must list at least one non-empty scope".to_string(),
            ));
        }

        if !POSTGRES_SSL_MODES.contains(&self.database.sslmode.as_str()) {
            return Err(AppError::Config(format!(
                "database.sslmode must be one of {}",
                POSTGRES_SSL_MODES.join(", ")
            )));
        }

        if self.database.max_connections == 0 {
            return Err(AppError::Config(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        if self.database.connect_retries == 0 {
            return Err(AppError::Config(
                "database.connect_retries must be greater than 0".to_string(),
            ));
        }

        if self.github.timeout_seconds == 0 {
            return Err(AppError::Config(
                "github.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        require_non_empty("session.cookie_name", &self.session.cookie_name)?;

        if self.session.lifetime_seconds <= 0
            || self.session.lifetime_seconds > MAX_SESSION_LIFETIME_SECONDS
        {
            return Err(AppError::Config(format!(
                "session.lifetime_seconds must be between 1 and {MAX_SESSION_LIFETIME_SECONDS}"
            )));
        }

        if self.session.cleanup_interval_seconds == 0 {
            return Err(AppError::Config(
                "session.cleanup_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.session.cookie_same_site == SameSitePolicy::None && !self.session.cookie_secure {
            return Err(AppError::Config(
                "session.cookie_same_site=none requires session.cookie_secure=true".to_string(),
            ));
        }

        Ok(())
    }
}

/// Environment variables with UTF-8 names and values; others are skipped
fn utf8_env(vars: impl IntoIterator<Item = (OsString, OsString)>) -> HashMap<String, String> {
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (Ok(key), Err(_)) => {
                tracing::warn!(variable = %key, "Ignoring environment variable with non UTF-8 value");
                None
            }
            (Err(_), _) => None,
        })
        .collect()
}

/// Drop empty variables and expand flat aliases into prefixed keys
fn normalize_env(mut env: HashMap<String, String>) -> HashMap<String, String> {
    env.retain(|_, value| !value.trim().is_empty());

    for (alias, key) in ENV_ALIASES {
        let prefixed = format!("{ENV_PREFIX}__{key}");
        if env.contains_key(&prefixed) {
            continue;
        }
        if let Some(value) = env.get(*alias).cloned() {
            env.insert(prefixed, value);
        }
    }

    env
}

fn parse_scope_list(raw: &str) -> Vec<String> {
    raw.split([',', ' '])
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn require_non_empty(key: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Config(format!("{key} must be set")));
    }
    Ok(())
}

fn require_http_url(key: &str, value: &str) -> Result<(), AppError> {
    let url = url::Url::parse(value)
        .map_err(|e| AppError::Config(format!("{key} is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Config(format!("{key} must use http or https")));
    }
    Ok(())
}
