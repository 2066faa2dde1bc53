// Configuration module entry point
// Loads the process-wide configuration once at startup

mod types;

use std::net::SocketAddr;

use crate::error::ConfigError;

// Re-export public types
pub use types::{BackendConfig, Config, EdgeConfig};

/// Default config file (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Environment variables prefixed with `EDGE_` override file values,
    /// e.g. `EDGE_SERVER__PORT=9090`.
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let builder = with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("EDGE")
                    .prefix_separator("_")
                    .separator("__"),
            );

        finish(builder)
    }

    /// Load configuration from an in-memory TOML document, on top of the defaults
    #[cfg(test)]
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let builder = with_defaults(config::Config::builder())?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));

        finish(builder)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    /// Check that every backend the router names is defined and the
    /// host override can be sent as a header
    pub fn validate(&self) -> Result<(), ConfigError> {
        if hyper::header::HeaderValue::from_str(&self.edge.host_override).is_err() {
            return Err(ConfigError::InvalidHostOverride(
                self.edge.host_override.clone(),
            ));
        }
        for name in [&self.edge.backend_name, &self.edge.other_backend_name] {
            if !self.backends.contains_key(name) {
                return Err(ConfigError::MissingBackend(name.clone()));
            }
        }
        self.get_socket_addr()?;
        Ok(())
    }
}

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

fn with_defaults(builder: Builder) -> Result<Builder, ConfigError> {
    let edge = EdgeConfig::default();
    Ok(builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")?
        .set_default("performance.keep_alive_timeout", 75)?
        .set_default("performance.read_timeout", 30)?
        .set_default("performance.write_timeout", 30)?
        .set_default("http.max_body_size", 10_485_760)? // 10MB
        .set_default("edge.host_override", edge.host_override)?
        .set_default("edge.backend_name", edge.backend_name)?
        .set_default("edge.other_backend_name", edge.other_backend_name)?)
}

fn finish(builder: Builder) -> Result<Config, ConfigError> {
    let config: Config = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKENDS: &str = r#"
        [backends.backend_name]
        url = "http://127.0.0.1:9001"

        [backends.other_backend_name]
        url = "http://127.0.0.1:9002"
        first_byte_timeout_ms = 500
    "#;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml_str(BACKENDS).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.edge, EdgeConfig::default());
        assert_eq!(config.edge.host_override, "example.com");
        assert_eq!(config.http.max_body_size, 10_485_760);
        assert_eq!(config.cache.max_entries, 1024);
        assert_eq!(config.logging.access_log_format, "combined");
        assert_eq!(
            config.backends["other_backend_name"].first_byte_timeout_ms,
            Some(500)
        );
    }

    #[test]
    fn test_file_values_override_defaults() {
        let toml = format!(
            "{BACKENDS}\n[server]\nport = 9090\n\n[edge]\nhost_override = \"origin.internal\"\n"
        );
        let config = Config::from_toml_str(&toml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.edge.host_override, "origin.internal");
        assert_eq!(config.edge.backend_name, "backend_name");
    }

    #[test]
    fn test_missing_backend_rejected() {
        let err = Config::from_toml_str(
            "[backends.backend_name]\nurl = \"http://127.0.0.1:9001\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingBackend(ref name) if name == "other_backend_name"));
    }

    #[test]
    fn test_invalid_host_override_rejected() {
        let toml = format!("{BACKENDS}\n[edge]\nhost_override = \"bad\\nhost\"\n");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHostOverride(_)));
    }

    #[test]
    fn test_invalid_address_rejected() {
        let toml = format!("{BACKENDS}\n[server]\nhost = \"not an ip\"\n");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress(_)));
    }
}
