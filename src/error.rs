//! Error types
//!
//! Routing outcomes (404/405) are ordinary responses, not errors. The types here
//! cover what can go wrong beneath the router: reaching an upstream and loading
//! configuration.

use thiserror::Error;

/// Failure to obtain a response from a named backend.
///
/// The router never inspects these; the server layer turns them into a 503.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    #[error("invalid upstream uri: {0}")]
    InvalidUri(#[from] hyper::http::uri::InvalidUriParts),

    #[error("upstream request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read upstream body: {0}")]
    Body(#[from] hyper::Error),

    #[error("backend '{0}' did not respond in time")]
    Timeout(String),
}

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),

    #[error("host override '{0}' is not a valid header value")]
    InvalidHostOverride(String),

    #[error("backend '{name}' is invalid: {reason}")]
    InvalidBackend { name: String, reason: String },

    #[error("backend '{0}' is referenced by the router but not defined under [backends]")]
    MissingBackend(String),
}
