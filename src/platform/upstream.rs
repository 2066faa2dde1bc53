//! Upstream fetcher
//!
//! Production [`Fetcher`]: resolves the backend, consults the response cache
//! according to the policy, and forwards over a pooled HTTP/1 client.

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderName, CONNECTION};
use hyper::http::response::Parts;
use hyper::{HeaderMap, Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::collections::HashMap;
use std::time::Instant;

use super::backend::{Backend, BackendRegistry};
use super::cache::{is_cacheable_method, is_cacheable_status, CacheKey, ResponseCache};
use super::fetch::Fetcher;
use crate::error::FetchError;
use crate::http::CachePolicy;

type HttpClient = Client<HttpConnector, Full<Bytes>>;

/// Connection-scoped headers, never forwarded in either direction
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub struct UpstreamFetcher {
    registry: BackendRegistry,
    clients: HashMap<String, HttpClient>,
    cache: ResponseCache,
}

impl UpstreamFetcher {
    pub fn new(registry: BackendRegistry, cache: ResponseCache) -> Self {
        let clients = registry
            .iter()
            .map(|backend| (backend.name().to_string(), build_client(backend)))
            .collect();

        Self {
            registry,
            clients,
            cache,
        }
    }

    pub const fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Forward to the origin and buffer the whole response
    async fn send(
        &self,
        backend: &Backend,
        req: Request<Full<Bytes>>,
    ) -> Result<(Parts, Bytes), FetchError> {
        let client = self
            .clients
            .get(backend.name())
            .ok_or_else(|| FetchError::UnknownBackend(backend.name().to_string()))?;

        let (mut parts, body) = req.into_parts();
        parts.uri = backend.upstream_uri(&parts.uri)?;
        strip_hop_by_hop(&mut parts.headers);
        // The client only fills in Host when it is absent, so the router's value is kept
        let pending = client.request(Request::from_parts(parts, body));

        let upstream = match backend.first_byte_timeout() {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| FetchError::Timeout(backend.name().to_string()))??,
            None => pending.await?,
        };

        let (mut parts, body) = upstream.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        let body = body.collect().await?.to_bytes();
        Ok((parts, body))
    }
}

/// Remove the fixed hop-by-hop set plus any header the `Connection` field names
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn build_client(backend: &Backend) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(backend.connect_timeout());
    Client::builder(TokioExecutor::new()).build(connector)
}

impl Fetcher for UpstreamFetcher {
    async fn fetch(
        &self,
        req: Request<Full<Bytes>>,
        backend: &str,
        policy: CachePolicy,
    ) -> Result<Response<Full<Bytes>>, FetchError> {
        let target = self.registry.resolve(backend)?;

        let ttl = policy.ttl().filter(|_| is_cacheable_method(req.method()));
        let key = CacheKey::new(backend, req.method(), req.uri());

        if ttl.is_some() {
            if let Some(resp) = self.cache.lookup(&key, Instant::now()).await {
                tracing::debug!(backend, %policy, uri = %req.uri(), "cache hit");
                return Ok(resp);
            }
        }

        tracing::debug!(backend, %policy, uri = %req.uri(), "forwarding to origin");
        let (parts, body) = self.send(target, req).await?;

        if let Some(ttl) = ttl.filter(|_| is_cacheable_status(parts.status)) {
            let stored = self
                .cache
                .store(key, &parts, body.clone(), ttl, Instant::now())
                .await;
            if !stored {
                tracing::warn!(backend, "response cache full, response not stored");
            }
        }

        Ok(Response::from_parts(parts, Full::new(body)))
    }
}
