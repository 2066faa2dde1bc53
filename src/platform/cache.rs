//! Response cache
//!
//! In-memory store for upstream responses fetched under a TTL policy. Entries
//! expire `ttl` after they were fetched and are evicted lazily, on lookup or by
//! [`ResponseCache::purge_expired`].

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::response::Parts;
use hyper::{HeaderMap, Method, Response, StatusCode, Uri, Version};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cache key: backend, method and request target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    backend: String,
    method: Method,
    target: String,
}

impl CacheKey {
    pub fn new(backend: &str, method: &Method, uri: &Uri) -> Self {
        Self {
            backend: backend.to_string(),
            method: method.clone(),
            target: uri
                .path_and_query()
                .map_or_else(|| "/".to_string(), ToString::to_string),
        }
    }
}

/// Only safe methods are stored
pub fn is_cacheable_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

/// Statuses an edge cache keeps by default; a TTL override only changes how long
pub fn is_cacheable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK
            | StatusCode::NON_AUTHORITATIVE_INFORMATION
            | StatusCode::MULTIPLE_CHOICES
            | StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::NOT_FOUND
            | StatusCode::GONE
    )
}

#[derive(Debug, Clone)]
struct CachedResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    expires_at: Instant,
}

impl CachedResponse {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    fn to_response(&self) -> Response<Full<Bytes>> {
        let mut resp = Response::new(Full::new(self.body.clone()));
        *resp.status_mut() = self.status;
        *resp.version_mut() = self.version;
        *resp.headers_mut() = self.headers.clone();
        resp
    }
}

pub struct ResponseCache {
    entries: RwLock<HashMap<CacheKey, CachedResponse>>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
        }
    }

    /// Return a fresh copy of the stored response, evicting it if it has expired
    pub async fn lookup(&self, key: &CacheKey, now: Instant) -> Option<Response<Full<Bytes>>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_fresh(now) => return Some(entry.to_response()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        // Another task may have refreshed the entry between the two locks
        if entries.get(key).is_some_and(|entry| !entry.is_fresh(now)) {
            entries.remove(key);
        }
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(CachedResponse::to_response)
    }

    /// Store a response fetched at `fetched_at` for `ttl`.
    ///
    /// Returns false when the cache is full of live entries and nothing was stored.
    pub async fn store(
        &self,
        key: CacheKey,
        parts: &Parts,
        body: Bytes,
        ttl: Duration,
        fetched_at: Instant,
    ) -> bool {
        if ttl.is_zero() || self.max_entries == 0 {
            return false;
        }

        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            entries.retain(|_, entry| entry.is_fresh(fetched_at));
            if entries.len() >= self.max_entries {
                return false;
            }
        }

        entries.insert(
            key,
            CachedResponse {
                status: parts.status,
                version: parts.version,
                headers: parts.headers.clone(),
                body,
                expires_at: fetched_at + ttl,
            },
        );
        true
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn parts(status: u16) -> Parts {
        let resp = Response::builder()
            .status(status)
            .header("x-origin", "test")
            .body(())
            .unwrap();
        resp.into_parts().0
    }

    fn key(backend: &str, path: &str) -> CacheKey {
        CacheKey::new(backend, &Method::GET, &path.parse().unwrap())
    }

    #[tokio::test]
    async fn test_entry_served_until_expiry() {
        let cache = ResponseCache::new(16);
        let t0 = Instant::now();
        let ttl = Duration::from_secs(60);

        assert!(cache.store(key("a", "/backend"), &parts(200), Bytes::from("hello"), ttl, t0).await);

        let resp = cache
            .lookup(&key("a", "/backend"), t0 + Duration::from_secs(59))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["x-origin"], "test");
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from("hello"));

        assert!(cache.lookup(&key("a", "/backend"), t0 + ttl).await.is_none());
        // Expired entry was evicted on lookup
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_keys_separate_backends_and_targets() {
        let cache = ResponseCache::new(16);
        let now = Instant::now();
        let ttl = Duration::from_secs(60);
        cache.store(key("a", "/backend"), &parts(200), Bytes::new(), ttl, now).await;

        assert!(cache.lookup(&key("b", "/backend"), now).await.is_none());
        assert!(cache.lookup(&key("a", "/backend?x=1"), now).await.is_none());
        let head = CacheKey::new("a", &Method::HEAD, &"/backend".parse().unwrap());
        assert!(cache.lookup(&head, now).await.is_none());
        assert!(cache.lookup(&key("a", "/backend"), now).await.is_some());
    }

    #[tokio::test]
    async fn test_zero_ttl_not_stored() {
        let cache = ResponseCache::new(16);
        let stored = cache
            .store(key("a", "/"), &parts(200), Bytes::new(), Duration::ZERO, Instant::now())
            .await;
        assert!(!stored);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_full_cache_purges_expired_before_refusing() {
        let cache = ResponseCache::new(2);
        let t0 = Instant::now();
        let short = Duration::from_secs(1);
        let long = Duration::from_secs(60);

        assert!(cache.store(key("a", "/1"), &parts(200), Bytes::new(), short, t0).await);
        assert!(cache.store(key("a", "/2"), &parts(200), Bytes::new(), long, t0).await);

        // "/1" has expired, so there is room
        let later = t0 + Duration::from_secs(5);
        assert!(cache.store(key("a", "/3"), &parts(200), Bytes::new(), long, later).await);
        assert_eq!(cache.len().await, 2);

        // Both live: refused
        assert!(!cache.store(key("a", "/4"), &parts(200), Bytes::new(), long, later).await);
        // Replacing an existing key is always allowed
        assert!(cache.store(key("a", "/2"), &parts(404), Bytes::new(), long, later).await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = ResponseCache::new(16);
        let t0 = Instant::now();
        cache.store(key("a", "/1"), &parts(200), Bytes::new(), Duration::from_secs(1), t0).await;
        cache.store(key("a", "/2"), &parts(200), Bytes::new(), Duration::from_secs(60), t0).await;

        assert_eq!(cache.purge_expired(t0 + Duration::from_secs(2)).await, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[test]
    fn test_cacheable_methods() {
        assert!(is_cacheable_method(&Method::GET));
        assert!(is_cacheable_method(&Method::HEAD));
        assert!(!is_cacheable_method(&Method::POST));
    }

    #[test]
    fn test_cacheable_statuses() {
        for status in [200, 203, 301, 302, 404, 410] {
            assert!(is_cacheable_status(StatusCode::from_u16(status).unwrap()));
        }
        for status in [201, 304, 400, 500, 502, 503] {
            assert!(!is_cacheable_status(StatusCode::from_u16(status).unwrap()));
        }
    }
}
