use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::query::executor::DEFAULT_CONVERTED_STATUS;

/// Application configuration loaded from environment variables or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// DuckDB database file holding `survey_responses`.
    /// If not set, an empty in-memory database is used.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// `response_status_id` that counts as converted.
    #[serde(default = "default_converted_status")]
    pub converted_status_id: i32,
    /// Dashboard origin for CORS restrictions.
    /// If not set, any origin may read the reports.
    #[serde(default)]
    pub dashboard_origin: Option<String>,
    /// Query cache TTL in seconds (default: 0, no caching).
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Graceful shutdown timeout in seconds (default: 30).
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3001
}

const fn default_converted_status() -> i32 {
    DEFAULT_CONVERTED_STATUS
}

/// Caching is opt-in: every request hits the store unless a TTL is configured.
const fn default_cache_ttl_secs() -> u64 {
    0
}

const fn default_shutdown_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: None,
            converted_status_id: default_converted_status(),
            dashboard_origin: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `PULSE_HOST` → host
    /// - `PULSE_PORT` → port
    /// - `PULSE_DATABASE` → database_path
    /// - `PULSE_CONVERTED_STATUS` → converted_status_id
    /// - `PULSE_DASHBOARD_ORIGIN` → dashboard_origin
    /// - `PULSE_CACHE_TTL` → cache_ttl_secs
    /// - `PULSE_SHUTDOWN_TIMEOUT` → shutdown_timeout_secs
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        if let Ok(host) = std::env::var("PULSE_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PULSE_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }
        if let Ok(db) = std::env::var("PULSE_DATABASE") {
            config.database_path = Some(PathBuf::from(db));
        }
        if let Ok(val) = std::env::var("PULSE_CONVERTED_STATUS") {
            if let Ok(s) = val.parse() {
                config.converted_status_id = s;
            }
        }
        if let Ok(origin) = std::env::var("PULSE_DASHBOARD_ORIGIN") {
            config.dashboard_origin = Some(origin);
        }
        if let Ok(val) = std::env::var("PULSE_CACHE_TTL") {
            if let Ok(t) = val.parse() {
                config.cache_ttl_secs = t;
            }
        }
        if let Ok(val) = std::env::var("PULSE_SHUTDOWN_TIMEOUT") {
            if let Ok(t) = val.parse() {
                config.shutdown_timeout_secs = t;
            }
        }

        config
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
