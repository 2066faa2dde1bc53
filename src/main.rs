use std::sync::Arc;
use std::time::{Duration, Instant};

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod platform;
mod server;

use platform::{BackendRegistry, ResponseCache, UpstreamFetcher};
use server::AppState;

/// How often expired cache entries are swept
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let registry = BackendRegistry::from_config(&cfg.backends)?;
    for backend in registry.iter() {
        logger::log_backend(backend.name(), backend.authority().as_str());
    }
    let fetcher = UpstreamFetcher::new(registry, ResponseCache::new(cfg.cache.max_entries));

    let listener = server::create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    let state = Arc::new(AppState::new(cfg, fetcher));

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            tokio::task::spawn_local(sweep_cache(Arc::clone(&state)));
            server::start_server_loop(listener, state, signals).await
        })
        .await
}

/// Periodically drop expired responses so unused entries do not pile up
async fn sweep_cache(state: Arc<AppState<UpstreamFetcher>>) {
    let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
    interval.tick().await;
    loop {
        interval.tick().await;
        let cache = state.fetcher.cache();
        let removed = cache.purge_expired(Instant::now()).await;
        if removed > 0 {
            tracing::debug!(removed, remaining = cache.len().await, "swept response cache");
        }
    }
}
