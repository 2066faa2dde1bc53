// Server loop module
// Accepts connections until shutdown is requested, then drains in-flight ones

use hyper_util::server::graceful::GracefulShutdown;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use super::state::AppState;
use crate::logger;
use crate::platform::Fetcher;

/// Accept loop. Must run inside a `LocalSet`.
///
/// On shutdown the listener is closed first, then open connections get up to
/// `performance.write_timeout` seconds to finish.
pub async fn start_server_loop<F>(
    listener: TcpListener,
    state: Arc<AppState<F>>,
    signals: Arc<SignalHandler>,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Fetcher + 'static,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    let graceful = GracefulShutdown::new();
    let mut shutdown = signals.subscribe();

    while !signals.is_shutdown_requested() {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, &graceful);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            _ = shutdown.changed() => {}
        }
    }

    drop(listener);

    let grace = Duration::from_secs(state.config.performance.write_timeout);
    tokio::select! {
        () = graceful.shutdown() => logger::log_shutdown_complete(0),
        () = tokio::time::sleep(grace) => {
            logger::log_shutdown_complete(active_connections.load(Ordering::SeqCst));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::FetchError;
    use crate::http::CachePolicy;
    use crate::server::create_reusable_listener;
    use http_body_util::Full;
    use hyper::body::Bytes;
    use hyper::{Request, Response};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    struct NoBackends;

    impl Fetcher for NoBackends {
        async fn fetch(
            &self,
            _req: Request<Full<Bytes>>,
            backend: &str,
            _policy: CachePolicy,
        ) -> Result<Response<Full<Bytes>>, FetchError> {
            Err(FetchError::UnknownBackend(backend.to_string()))
        }
    }

    async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let config = Config::from_toml_str(
            r#"
            [logging]
            access_log = false

            [performance]
            write_timeout = 1

            [backends.backend_name]
            url = "http://127.0.0.1:9001"

            [backends.other_backend_name]
            url = "http://127.0.0.1:9002"
            "#,
        )
        .unwrap();
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(AppState::new(config, NoBackends));
        let signals = Arc::new(SignalHandler::new());

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let server = tokio::task::spawn_local(start_server_loop(
                    listener,
                    state,
                    Arc::clone(&signals),
                ));

                let response = raw_request(
                    addr,
                    "GET / HTTP/1.1\r\nHost: edge.test\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(response.starts_with("HTTP/1.1 200 OK"));
                assert!(response.contains("compute-welcome"));

                let response = raw_request(
                    addr,
                    "GET /other HTTP/1.1\r\nHost: edge.test\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(response.starts_with("HTTP/1.1 404 Not Found"));

                let response = raw_request(
                    addr,
                    "GET /backend HTTP/1.1\r\nHost: edge.test\r\nConnection: close\r\n\r\n",
                )
                .await;
                assert!(response.starts_with("HTTP/1.1 503 Service Unavailable"));

                signals.trigger("test");
                server.await.unwrap().unwrap();
            })
            .await;
    }
}
