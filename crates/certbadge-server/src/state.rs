//! Shared application state for the `certbadge` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`.

use std::sync::Arc;

use certbadge_core::cache::ResponseCache;
use certbadge_core::convert::Converter;
use certbadge_core::record::RecordStore;
use certbadge_core::service::ImageService;
use certbadge_storage::StorageBackend;

use crate::config::ServerConfig;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Certificate records.
    pub records: Arc<RecordStore>,
    /// Rendered image responses keyed by identifier, format and query.
    pub cache: Arc<ResponseCache>,
    /// Image request orchestration.
    pub images: ImageService,
    /// Key expected in `X-Api-Key` on admin routes.
    pub admin_api_key: Option<String>,
}

impl AppState {
    /// Wire the record store, response cache and image service over
    /// `storage`.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        converter: Converter,
        config: &ServerConfig,
    ) -> Self {
        let records = Arc::new(RecordStore::new(storage));
        let cache = Arc::new(ResponseCache::new());
        let images = ImageService::new(Arc::clone(&records), Arc::clone(&cache), converter)
            .with_template(config.certificate_template.clone())
            .with_cache_ttl(config.cache_ttl);

        Self {
            records,
            cache,
            images,
            admin_api_key: config.admin_api_key.clone(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
