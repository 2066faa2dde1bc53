//! HTTP cache control module
//!
//! Per-request cache directives attached to a forwarded request.

use std::time::Duration;

/// Cache policy for a proxied response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Cache the upstream response for the given number of seconds,
    /// measured from the time it was fetched
    Ttl(u32),
    /// Never cache; always go to the origin
    Pass,
}

impl CachePolicy {
    /// Lifetime of a stored response, `None` if the response must not be stored
    pub fn ttl(self) -> Option<Duration> {
        match self {
            Self::Ttl(0) | Self::Pass => None,
            Self::Ttl(secs) => Some(Duration::from_secs(u64::from(secs))),
        }
    }
}

impl std::fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ttl(secs) => write!(f, "ttl={secs}s"),
            Self::Pass => f.write_str("pass"),
        }
    }
}
