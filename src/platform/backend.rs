//! Backend registry
//!
//! Resolves backend names to origins. Built once at startup, immutable afterwards.

use hyper::http::uri::{Authority, Parts, PathAndQuery, Scheme};
use hyper::Uri;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::error::{ConfigError, FetchError};

/// A named upstream origin
#[derive(Debug, Clone)]
pub struct Backend {
    name: String,
    authority: Authority,
    connect_timeout: Option<Duration>,
    first_byte_timeout: Option<Duration>,
}

impl Backend {
    pub fn from_config(name: &str, config: &BackendConfig) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBackend {
            name: name.to_string(),
            reason,
        };

        let uri: Uri = config
            .url
            .parse()
            .map_err(|e| invalid(format!("'{}': {e}", config.url)))?;

        // HttpConnector speaks plain HTTP only
        if uri.scheme() != Some(&Scheme::HTTP) {
            return Err(invalid(format!("'{}' must be an http:// URL", config.url)));
        }
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| invalid(format!("'{}' has no host", config.url)))?;
        if !matches!(uri.path(), "" | "/") || uri.query().is_some() {
            return Err(invalid(format!(
                "'{}' must not carry a path or query",
                config.url
            )));
        }

        Ok(Self {
            name: name.to_string(),
            authority,
            connect_timeout: config.connect_timeout_ms.map(Duration::from_millis),
            first_byte_timeout: config.first_byte_timeout_ms.map(Duration::from_millis),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn authority(&self) -> &Authority {
        &self.authority
    }

    pub const fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub const fn first_byte_timeout(&self) -> Option<Duration> {
        self.first_byte_timeout
    }

    /// Point a request URI at this origin, keeping its path and query
    pub fn upstream_uri(&self, uri: &Uri) -> Result<Uri, FetchError> {
        let mut parts = Parts::default();
        parts.scheme = Some(Scheme::HTTP);
        parts.authority = Some(self.authority.clone());
        parts.path_and_query = Some(
            uri.path_and_query()
                .cloned()
                .unwrap_or_else(|| PathAndQuery::from_static("/")),
        );
        Ok(Uri::from_parts(parts)?)
    }
}

/// All configured backends, keyed by name
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Backend>,
}

impl BackendRegistry {
    pub fn from_config(configs: &HashMap<String, BackendConfig>) -> Result<Self, ConfigError> {
        let backends = configs
            .iter()
            .map(|(name, config)| Ok((name.clone(), Backend::from_config(name, config)?)))
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;
        Ok(Self { backends })
    }

    pub fn resolve(&self, name: &str) -> Result<&Backend, FetchError> {
        self.backends
            .get(name)
            .ok_or_else(|| FetchError::UnknownBackend(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Backend> {
        self.backends.values()
    }
}
