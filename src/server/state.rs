// Application state module
// Everything a connection needs, shared read-only across connections

use crate::config::Config;

/// Application state
pub struct AppState<F> {
    pub config: Config,
    /// Fetch capability handed to the router
    pub fetcher: F,
}

impl<F> AppState<F> {
    pub const fn new(config: Config, fetcher: F) -> Self {
        Self { config, fetcher }
    }
}
