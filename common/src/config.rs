//! Application configuration.
//!
//! Configuration is read once from the process environment at startup and is
//! never mutated afterwards. The [`DatabaseRegistry`] maps every logical
//! database key to its internal and external connection URLs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};

/// Database keys served when `DASHBOARD_DATABASES` is not set.
pub const DEFAULT_DATABASE_KEYS: &str = "vie_anterieure";

/// Which URL variant of each database the process connects through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Hosted deployment: private network URLs.
    Internal,
    /// Local development: publicly reachable URLs.
    External,
}

impl DeploymentMode {
    /// Derives the mode from the `APP_ENV` value.
    ///
    /// `local` selects the external URLs; any other value is a hosted
    /// environment and selects the internal ones.
    pub fn from_app_env(app_env: &str) -> Self {
        if app_env.trim().eq_ignore_ascii_case("local") {
            DeploymentMode::External
        } else {
            DeploymentMode::Internal
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::Internal => write!(f, "internal"),
            DeploymentMode::External => write!(f, "external"),
        }
    }
}

/// Internal/external URL pair of one logical database.
#[derive(Debug, Clone, Default)]
pub struct DatabaseUrls {
    pub internal: Option<String>,
    pub external: Option<String>,
}

impl DatabaseUrls {
    /// Returns the URL for `mode`, if configured and non-blank.
    pub fn select(&self, mode: DeploymentMode) -> Option<&str> {
        let url = match mode {
            DeploymentMode::Internal => self.internal.as_deref(),
            DeploymentMode::External => self.external.as_deref(),
        };
        url.map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Static mapping from database key to connection URLs.
#[derive(Debug, Clone, Default)]
pub struct DatabaseRegistry {
    entries: BTreeMap<String, DatabaseUrls>,
}

impl DatabaseRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any previous one with the same key.
    pub fn with_database(mut self, key: impl Into<String>, urls: DatabaseUrls) -> Self {
        self.entries.insert(key.into(), urls);
        self
    }

    /// Builds the registry for a comma-separated key list, reading
    /// `DB_<KEY>_INTERNAL` and `DB_<KEY>_EXTERNAL` through `lookup`.
    pub fn from_lookup<F>(keys: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut registry = Self::new();
        for key in keys.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            let prefix = format!("DB_{}", key.to_uppercase());
            let urls = DatabaseUrls {
                internal: lookup(&format!("{prefix}_INTERNAL")),
                external: lookup(&format!("{prefix}_EXTERNAL")),
            };
            registry.entries.insert(key.to_string(), urls);
        }
        registry
    }

    /// Builds the registry from the process environment.
    pub fn from_env() -> Self {
        let keys = std::env::var("DASHBOARD_DATABASES")
            .unwrap_or_else(|_| DEFAULT_DATABASE_KEYS.to_string());
        Self::from_lookup(&keys, |name| std::env::var(name).ok())
    }

    /// Returns the configured database keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the number of registered databases.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no database is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves the connection URL of `key` for `mode`.
    ///
    /// # Errors
    /// `UnknownDatabase` when the key is not registered, `MissingConfiguration`
    /// when the selected variant has no URL.
    pub fn url_for(&self, key: &str, mode: DeploymentMode) -> AppResult<&str> {
        let urls = self
            .entries
            .get(key)
            .ok_or_else(|| AppError::UnknownDatabase(key.to_string()))?;

        urls.select(mode).ok_or_else(|| {
            AppError::MissingConfiguration(format!(
                "no {} URL configured for database '{}' (DB_{}_{})",
                mode,
                key,
                key.to_uppercase(),
                mode.to_string().to_uppercase()
            ))
        })
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Process-wide service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name reported in responses and logs.
    pub service_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Deployment mode selecting internal or external URLs.
    pub mode: DeploymentMode,
    /// Database key to URL mapping.
    pub databases: DatabaseRegistry,
    /// Timeout for opening a single connection.
    pub connect_timeout_secs: u64,
    /// Rows returned by a table listing when the caller gives no limit.
    pub row_limit: u32,
    /// Upper bound for caller-supplied row limits.
    pub max_row_limit: u32,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "dashboard-service".to_string(),
            host: "0.0.0.0".to_string(),
            port: 5001,
            mode: DeploymentMode::External,
            databases: DatabaseRegistry::new(),
            connect_timeout_secs: 10,
            row_limit: 50,
            max_row_limit: 500,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the environment for the given service.
    pub fn load_with_service(service_name: &str) -> Self {
        let defaults = Self::default();
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());

        let mut max_row_limit = env_parse("MAX_ROW_LIMIT").unwrap_or(defaults.max_row_limit);
        if max_row_limit == 0 {
            max_row_limit = defaults.max_row_limit;
        }
        let row_limit = env_parse("ROW_LIMIT")
            .unwrap_or(defaults.row_limit)
            .clamp(1, max_row_limit);

        let log_format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            service_name: service_name.to_string(),
            host: std::env::var("SERVER_HOST").unwrap_or(defaults.host),
            port: env_parse("SERVER_PORT").unwrap_or(defaults.port),
            mode: DeploymentMode::from_app_env(&app_env),
            databases: DatabaseRegistry::from_env(),
            connect_timeout_secs: env_parse("DB_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.connect_timeout_secs),
            row_limit,
            max_row_limit,
            log_format,
        }
    }

    /// Clamps a caller-supplied row limit to the configured bounds.
    pub fn effective_row_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.row_limit)
            .clamp(1, self.max_row_limit)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
