//! Platform layer
//!
//! Stands in for the hosting edge runtime: named backends, the fetch primitive
//! and the response cache behind it. The router only sees [`Fetcher`].

pub mod backend;
pub mod cache;
pub mod fetch;
pub mod upstream;

pub use backend::BackendRegistry;
pub use cache::ResponseCache;
pub use fetch::Fetcher;
pub use upstream::UpstreamFetcher;
