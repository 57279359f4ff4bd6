//! Client configuration resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`GLINK_*`)
//! 3. TOML config file (`~/.config/glink/config.toml`)
//! 4. Compiled default (fallback)

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:50051";
const DEFAULT_CLIENT_ID: &str = "glink-client";
const DEFAULT_MAX_CONCURRENT_IMPORTS: usize = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 2;
const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the geometry service
    pub server_url: String,
    /// Identity sent with every request (`x-client-id` header)
    pub client_id: String,
    /// Upper bound on concurrently in-flight remote import calls
    pub max_concurrent_imports: usize,
    /// Per-request timeout for normal RPCs
    pub request_timeout: Duration,
    /// Timeout for the initial connection probe
    pub connect_timeout: Duration,
    /// Import event broadcast channel capacity
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            max_concurrent_imports: DEFAULT_MAX_CONCURRENT_IMPORTS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// On-disk configuration file shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub server_url: Option<String>,
    pub client_id: Option<String>,
    pub max_concurrent_imports: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub event_capacity: Option<usize>,
}

impl ClientConfig {
    /// Resolve configuration with an optional CLI server-url override
    pub fn resolve(cli_server_url: Option<&str>) -> Result<Self> {
        let toml_config = match default_config_path() {
            Some(path) if path.exists() => load_toml_config(&path)?,
            _ => TomlConfig::default(),
        };
        Ok(Self::from_sources(cli_server_url, &toml_config))
    }

    /// Combine CLI, environment, and TOML sources over compiled defaults
    pub fn from_sources(cli_server_url: Option<&str>, toml_config: &TomlConfig) -> Self {
        let defaults = Self::default();

        let server_url = cli_server_url
            .map(str::to_string)
            .or_else(|| std::env::var("GLINK_SERVER_URL").ok())
            .or_else(|| toml_config.server_url.clone())
            .unwrap_or(defaults.server_url);

        let client_id = std::env::var("GLINK_CLIENT_ID")
            .ok()
            .or_else(|| toml_config.client_id.clone())
            .unwrap_or(defaults.client_id);

        let max_concurrent_imports = env_parse("GLINK_MAX_CONCURRENT_IMPORTS")
            .or(toml_config.max_concurrent_imports)
            .unwrap_or(defaults.max_concurrent_imports)
            .max(1);

        let request_timeout = env_parse("GLINK_REQUEST_TIMEOUT_SECS")
            .or(toml_config.request_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let connect_timeout = env_parse("GLINK_CONNECT_TIMEOUT_SECS")
            .or(toml_config.connect_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.connect_timeout);

        let event_capacity = env_parse("GLINK_EVENT_CAPACITY")
            .or(toml_config.event_capacity)
            .unwrap_or(defaults.event_capacity)
            .max(1);

        Self {
            server_url,
            client_id,
            max_concurrent_imports,
            request_timeout,
            connect_timeout,
            event_capacity,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Platform config file location (`~/.config/glink/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("glink").join("config.toml"))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| ClientError::Config(format!("Invalid config file {}: {}", path.display(), e)))
}
