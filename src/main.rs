//! Offline Cache - an offline-first caching proxy for a static web app
//!
//! Runs the worker lifecycle against the configured upstream, then serves
//! clients through it.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_cache::cache::{CacheStorage, DiskStorage, MemoryStorage};
use offline_cache::{create_router, AppState, Config, Fetcher, HttpFetcher, Worker};

/// Main entry point for the offline cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Open the store directory, or in-memory stores without one
/// 4. Install: write the shell manifest and precache discovered assets
/// 5. Activate: retire stores from older generations. If install failed,
///    restore the generation a previous run left on disk instead
/// 6. Serve every request through the worker
/// 7. On SIGINT/SIGTERM stop accepting, then wait for background work
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Offline Cache");

    let config = Config::from_env();
    config.validate()?;
    info!(
        "Configuration loaded: generation={}, scope={}, upstream={}, max_media_entries={}, port={}",
        config.asset_store_name(),
        config.scope,
        config.upstream,
        config.max_media_entries,
        config.server_port
    );

    let port = config.server_port;
    let storage = open_storage(&config).await?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config)?);
    let worker = start_worker(Arc::new(config), storage, fetcher).await?;

    let app = create_router(AppState::new(worker.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let finished = worker.drain_background().await;
    info!("Server shutdown complete ({} background tasks finished)", finished);
    Ok(())
}

async fn open_storage(config: &Config) -> anyhow::Result<Arc<dyn CacheStorage>> {
    match &config.cache_dir {
        Some(dir) => {
            let storage = DiskStorage::open(dir)
                .await
                .with_context(|| format!("failed to open store directory {}", dir.display()))?;
            info!("Stores persisted under {}", dir.display());
            Ok(Arc::new(storage))
        }
        None => {
            info!("Stores kept in memory");
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}

/// Installs and activates a new worker, falling back to a stored generation
/// when install cannot complete.
async fn start_worker(
    config: Arc<Config>,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
) -> anyhow::Result<Worker> {
    let worker = Worker::new(config.clone(), storage.clone(), fetcher.clone());

    let install_error = match worker.install().await {
        Ok(report) => {
            info!(
                "Installed: {} manifest entries, {} precached",
                report.manifest_entries, report.precached
            );
            let retired = worker.activate().await.context("activation failed")?;
            if !retired.is_empty() {
                info!("Retired stores: {}", retired.join(", "));
            }
            return Ok(worker);
        }
        Err(e) => e,
    };

    warn!("Install failed ({}); trying the stored generation", install_error);
    let worker = Worker::new(config, storage, fetcher);
    if worker.restore().await.context("restore failed")? {
        info!("Serving stored generation {}", worker.config().asset_store_name());
        return Ok(worker);
    }
    Err(anyhow::Error::new(install_error).context("install failed and no stored generation to restore"))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
