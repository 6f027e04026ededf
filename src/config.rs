//! Configuration management for surreal-bridge.
//!
//! Handles loading configuration from TOML files and environment variables.
//! Connection settings are validated once, when the data source connects,
//! never per query.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default per-query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Default upper bound on concurrently running database calls.
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 16;

/// Main configuration structure for surreal-bridge.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Database connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Query execution settings.
    #[serde(default)]
    pub query: QueryConfig,
}

/// Query execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Per-query timeout in seconds (0 disables the deadline).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of database calls running at once.
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_QUERY_TIMEOUT_SECS
}

fn default_max_concurrent_queries() -> usize {
    DEFAULT_MAX_CONCURRENT_QUERIES
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_concurrent_queries: default_max_concurrent_queries(),
        }
    }
}

impl QueryConfig {
    /// Returns the per-query timeout, or None if disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConnectionConfig {
    /// Server endpoint, e.g. `http://localhost:8000` or `ws://localhost:8000/rpc`.
    pub endpoint: Option<String>,

    /// Namespace to use.
    pub namespace: Option<String>,

    /// Database to use.
    pub database: Option<String>,

    /// User to sign in as.
    pub username: Option<String>,

    /// Password (not recommended to store in config; see `store-password`).
    pub password: Option<String>,
}

impl ConnectionConfig {
    /// Merges another config into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &ConnectionConfig) {
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint.clone();
        }
        if other.namespace.is_some() {
            self.namespace = other.namespace.clone();
        }
        if other.database.is_some() {
            self.database = other.database.clone();
        }
        if other.username.is_some() {
            self.username = other.username.clone();
        }
        if other.password.is_some() {
            self.password = other.password.clone();
        }
    }

    /// Applies environment variables (SURREAL_ENDPOINT, SURREAL_NS, etc.) as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.endpoint.is_none() {
            self.endpoint = std::env::var("SURREAL_ENDPOINT").ok();
        }
        if self.namespace.is_none() {
            self.namespace = std::env::var("SURREAL_NS").ok();
        }
        if self.database.is_none() {
            self.database = std::env::var("SURREAL_DB").ok();
        }
        if self.username.is_none() {
            self.username = std::env::var("SURREAL_USER").ok();
        }
        if self.password.is_none() {
            self.password = std::env::var("SURREAL_PASS").ok();
        }
    }

    /// Checks that every field needed to connect is present and well formed.
    pub fn validate(&self) -> Result<()> {
        self.http_base_url()?;
        if self.namespace.as_deref().map_or(true, str::is_empty) {
            return Err(BridgeError::config("Namespace is required"));
        }
        if self.database.as_deref().map_or(true, str::is_empty) {
            return Err(BridgeError::config("Database is required"));
        }
        Ok(())
    }

    /// Returns the HTTP base URL for the configured endpoint.
    ///
    /// WebSocket endpoints (`ws://host/rpc`) are mapped to their HTTP
    /// counterpart so configurations written for the RPC protocol keep working.
    pub fn http_base_url(&self) -> Result<Url> {
        let endpoint = self
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| BridgeError::config("Endpoint is required"))?;

        let mut url = Url::parse(endpoint)
            .map_err(|e| BridgeError::config(format!("Invalid endpoint '{endpoint}': {e}")))?;

        let scheme = match url.scheme() {
            "http" | "ws" => "http",
            "https" | "wss" => "https",
            other => {
                return Err(BridgeError::config(format!(
                    "Invalid scheme '{other}'. Expected 'http', 'https', 'ws' or 'wss'"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| BridgeError::config(format!("Cannot use endpoint '{endpoint}'")))?;

        let path = url.path().trim_end_matches('/');
        let path = path.strip_suffix("/rpc").unwrap_or(path).to_string();
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        Ok(url)
    }

    /// Returns a display-safe string (no password) for logs.
    pub fn display_string(&self) -> String {
        let endpoint = self.endpoint.as_deref().unwrap_or("unknown");
        let namespace = self.namespace.as_deref().unwrap_or("?");
        let database = self.database.as_deref().unwrap_or("?");
        format!("{namespace}/{database} @ {endpoint}")
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("surreal-bridge")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            BridgeError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
