//! `certbadge` server entry point.
//!
//! Bootstraps the storage backend and image pipeline, then starts the Axum
//! HTTP server with graceful shutdown. A background cache sweeper runs
//! alongside the server and is cancelled on shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use certbadge_core::convert::Converter;
use certbadge_storage::{MemoryBackend, StorageBackend};

use certbadge_server::app::build_router;
use certbadge_server::config::{ServerConfig, StorageBackendType};
use certbadge_server::state::AppState;
use certbadge_server::worker::cache_sweep_worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment.
    let config = ServerConfig::from_env();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(
        storage = ?config.storage_backend,
        template = ?config.certificate_template,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        admin_api = config.admin_api_key.is_some(),
        "certbadge starting"
    );

    let state = Arc::new(build_app_state(&config)?);

    // Shutdown signal channel.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn response cache sweeper.
    let sweeper_handle = {
        let cache = Arc::clone(&state.cache);
        tokio::spawn(cache_sweep_worker(
            cache,
            shutdown_rx,
            config.cache_sweep_interval,
        ))
    };

    let app = build_router(Arc::clone(&state));

    // Bind and serve.
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "certbadge server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("server error")?;

    // Wait for background workers to finish (with timeout).
    info!("waiting for background workers to stop");
    let _ = tokio::time::timeout(Duration::from_secs(10), sweeper_handle).await;

    info!("certbadge server stopped");
    Ok(())
}

/// Build the shared application state.
fn build_app_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let storage: Arc<dyn StorageBackend> = match &config.storage_backend {
        StorageBackendType::Memory => {
            info!("using in-memory storage (data will not persist)");
            Arc::new(MemoryBackend::new())
        }
        #[cfg(feature = "rocksdb-backend")]
        StorageBackendType::RocksDb { path } => {
            let backend = certbadge_storage::RocksDbBackend::open(path)
                .context("failed to open RocksDB storage")?;
            info!(path = %backend.path().display(), "using RocksDB storage");
            Arc::new(backend)
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        StorageBackendType::RocksDb { .. } => {
            anyhow::bail!("RocksDB backend requested but feature 'rocksdb-backend' is not enabled");
        }
    };

    // Fail fast on a broken template file instead of on the first request.
    config
        .certificate_template
        .load()
        .context("failed to load certificate template")?;

    Ok(AppState::new(storage, Converter::with_system_fonts(), config))
}

/// Wait for SIGINT or SIGTERM, then broadcast shutdown.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
    let _ = shutdown_tx.send(true);
}
