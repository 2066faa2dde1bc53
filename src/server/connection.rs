// Connection handling module
// Accepts a TCP connection, serves it over HTTP/1 and runs each request
// through the router

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::state::AppState;
use crate::handler;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::platform::Fetcher;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Accept and process a connection, checking limits and logging.
///
/// Returns false if the connection was rejected.
pub fn accept_connection<F>(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState<F>>,
    conn_counter: &Arc<AtomicUsize>,
    graceful: &GracefulShutdown,
) -> bool
where
    F: Fetcher + 'static,
{
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return false;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        graceful,
    );
    true
}

/// Serve a single connection in a local task.
///
/// There is no cap on the connection as a whole. Waiting for a request head,
/// including between kept-alive requests, is bounded by `keep_alive_timeout`
/// (`read_timeout` when keep-alive is off). The connection is registered with
/// `graceful` so shutdown can wait for it.
fn handle_connection<F>(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState<F>>,
    conn_counter: Arc<AtomicUsize>,
    graceful: &GracefulShutdown,
) where
    F: Fetcher + 'static,
{
    let io = TokioIo::new(stream);
    let performance = &state.config.performance;
    let keep_alive = performance.keep_alive_timeout > 0;
    let idle_timeout = if keep_alive {
        performance.keep_alive_timeout
    } else {
        performance.read_timeout
    };

    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .keep_alive(keep_alive)
        .header_read_timeout(Duration::from_secs(idle_timeout));

    let service_state = Arc::clone(&state);
    let conn = builder.serve_connection(
        io,
        service_fn(move |req: Request<Incoming>| {
            let state = Arc::clone(&service_state);
            async move { serve_request(req, peer_addr, &state).await }
        }),
    );
    let conn = graceful.watch(conn);

    tokio::task::spawn_local(async move {
        if let Err(err) = conn.await {
            logger::log_connection_error(&err);
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Run one request through the router, acting as the hosting platform:
/// buffer the body, translate fetch failures, write the access log.
pub async fn serve_request<B, F>(
    req: Request<B>,
    peer_addr: SocketAddr,
    state: &AppState<F>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
    F: Fetcher,
{
    let logging = &state.config.logging;
    let mut entry = logging
        .access_log
        .then(|| AccessLogEntry::from_request(&peer_addr, &req));

    let max_body_size = state.config.http.max_body_size;
    let read_timeout = Duration::from_secs(state.config.performance.read_timeout);
    let response = match buffer_request(req, max_body_size, read_timeout).await {
        Ok(req) => {
            match handler::handle_request(req, &state.config.edge, &state.fetcher).await {
                Ok(resp) => resp,
                Err(e) => {
                    logger::log_error(&format!("Upstream fetch failed: {e}"));
                    http::build_503_response()
                }
            }
        }
        Err(resp) => resp,
    };

    if let Some(entry) = entry.as_mut() {
        let body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.finish(response.status().as_u16(), body_bytes);
        logger::log_access(entry, &logging.access_log_format);
    }

    Ok(response)
}

/// Read the whole request body, enforcing `max_body_size` and `read_timeout`
async fn buffer_request<B>(
    req: Request<B>,
    max_body_size: u64,
    read_timeout: Duration,
) -> Result<Request<Full<Bytes>>, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    if let Some(resp) = check_content_length(&req, max_body_size) {
        return Err(resp);
    }

    let (parts, body) = req.into_parts();
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match tokio::time::timeout(read_timeout, Limited::new(body, limit).collect()).await {
        Ok(Ok(collected)) => Ok(Request::from_parts(parts, Full::new(collected.to_bytes()))),
        Ok(Err(e)) if e.is::<LengthLimitError>() => {
            logger::log_error(&format!(
                "Request body too large (max: {max_body_size} bytes)"
            ));
            Err(http::build_413_response())
        }
        Ok(Err(e)) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Err(http::build_400_response())
        }
        Err(_) => {
            logger::log_warning(&format!(
                "Request body not received within {} seconds",
                read_timeout.as_secs()
            ));
            Err(http::build_408_response())
        }
    }
}

/// Reject early when Content-Length already exceeds the limit
fn check_content_length<B>(
    req: &Request<B>,
    max_body_size: u64,
) -> Option<Response<Full<Bytes>>> {
    let size = req
        .headers()
        .get(hyper::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()?;

    if size > max_body_size {
        logger::log_error(&format!(
            "Request body too large: {size} bytes (max: {max_body_size})"
        ));
        return Some(http::build_413_response());
    }
    None
}
