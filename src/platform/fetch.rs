//! Fetch capability
//!
//! The only way the router reaches an upstream. Production code uses
//! [`UpstreamFetcher`](super::UpstreamFetcher); tests substitute a recording double.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};

use crate::error::FetchError;
use crate::http::CachePolicy;

/// Send a request to a named backend under a cache policy and wait for the response.
///
/// The returned response is the upstream response, unmodified.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn fetch(
        &self,
        req: Request<Full<Bytes>>,
        backend: &str,
        policy: CachePolicy,
    ) -> Result<Response<Full<Bytes>>, FetchError>;
}
