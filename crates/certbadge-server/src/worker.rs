//! Background workers that run alongside the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use certbadge_core::cache::ResponseCache;

/// Periodically drop expired response-cache entries until `shutdown` flips
/// or its sender goes away.
pub async fn cache_sweep_worker(
    cache: Arc<ResponseCache>,
    mut shutdown: watch::Receiver<bool>,
    interval: Duration,
) {
    let mut interval = tokio::time::interval(interval);
    info!(interval_secs = interval.period().as_secs(), "cache sweeper started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    let remaining = cache.len().await;
                    debug!(purged, remaining, "purged expired cache entries");
                }
            }
            _ = shutdown.changed() => {
                info!("cache sweeper shutting down");
                return;
            }
        }
    }
}
