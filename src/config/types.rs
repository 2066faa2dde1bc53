// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub edge: EdgeConfig,
    /// Named upstream origins, keyed by backend name
    #[serde(default)]
    pub backends: HashMap<String, BackendConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Log file path (optional, stdout if not set)
    #[serde(default)]
    pub log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub max_body_size: u64,
}

/// Router configuration, read-only for the lifetime of the process.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EdgeConfig {
    /// Literal written into the `Host` header of every request
    pub host_override: String,
    /// Backend serving `/backend`
    pub backend_name: String,
    /// Backend serving `/other/*`
    pub other_backend_name: String,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            host_override: "example.com".to_string(),
            backend_name: "backend_name".to_string(),
            other_backend_name: "other_backend_name".to_string(),
        }
    }
}

/// A single upstream origin
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Origin URL, e.g. `http://127.0.0.1:9001`
    pub url: String,
    /// Connect timeout in milliseconds
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    /// Time to first byte of the upstream response, in milliseconds
    #[serde(default)]
    pub first_byte_timeout_ms: Option<u64>,
}

/// Response cache configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

#[allow(clippy::missing_const_for_fn)]
fn default_cache_max_entries() -> usize {
    1024
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
        }
    }
}
