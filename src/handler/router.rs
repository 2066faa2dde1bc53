//! Request routing dispatch module
//!
//! Entry point for every inbound request: rewrites Host, validates the method,
//! then either answers synthetically or forwards to a named backend.
//! Rules are evaluated in order and the first match wins.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, HOST};
use hyper::{Method, Request, Response};

use crate::config::EdgeConfig;
use crate::error::FetchError;
use crate::http::{self, CachePolicy};
use crate::logger;
use crate::platform::Fetcher;

/// Methods accepted at all; anything else is answered with 405
const ALLOWED_METHODS: [Method; 3] = [Method::HEAD, Method::GET, Method::POST];

/// How long `/backend` responses are cached, measured from when they are fetched
pub const BACKEND_TTL_SECS: u32 = 60;

/// Prefix forwarded to the other backend. `/other` alone does not match.
const OTHER_PREFIX: &str = "/other/";

/// Outcome of matching a request against the routing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    MethodNotAllowed,
    Welcome,
    Backend,
    Other,
    NotFound,
}

/// Match a method and path against the routing rules
pub fn route(method: &Method, path: &str) -> Route {
    if !ALLOWED_METHODS.contains(method) {
        return Route::MethodNotAllowed;
    }

    match (method, path) {
        (&Method::GET, "/") => Route::Welcome,
        (&Method::GET, "/backend") => Route::Backend,
        (&Method::GET, p) if p.starts_with(OTHER_PREFIX) => Route::Other,
        _ => Route::NotFound,
    }
}

/// Main entry point for HTTP request handling
///
/// Fetch failures are returned untouched; translating them is the caller's job.
pub async fn handle_request<F: Fetcher>(
    mut req: Request<Full<Bytes>>,
    edge: &EdgeConfig,
    fetcher: &F,
) -> Result<Response<Full<Bytes>>, FetchError> {
    override_host(&mut req, &edge.host_override);

    match route(req.method(), req.uri().path()) {
        Route::MethodNotAllowed => {
            logger::log_warning(&format!("Method not allowed: {}", req.method()));
            Ok(http::build_405_response())
        }
        Route::Welcome => Ok(http::build_welcome_response()),
        Route::Backend => {
            fetcher
                .fetch(req, &edge.backend_name, CachePolicy::Ttl(BACKEND_TTL_SECS))
                .await
        }
        Route::Other => {
            fetcher
                .fetch(req, &edge.other_backend_name, CachePolicy::Pass)
                .await
        }
        Route::NotFound => Ok(http::build_404_response()),
    }
}

/// Replace the Host header, applied to every request before routing
fn override_host<B>(req: &mut Request<B>, host: &str) {
    match HeaderValue::from_str(host) {
        Ok(value) => {
            req.headers_mut().insert(HOST, value);
        }
        Err(e) => logger::log_warning(&format!("Invalid host override '{host}': {e}")),
    }
}
