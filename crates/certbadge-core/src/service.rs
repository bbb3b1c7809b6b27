//! Image request orchestration.
//!
//! [`ImageService::handle_image_request`] resolves one image request:
//!
//! 1. validate the identifier (format and outlook were validated when the
//!    [`ImageRequest`] was parsed);
//! 2. serve from the [`ResponseCache`] unless `no_cache` is set;
//! 3. load the record and merge the request overrides into its config;
//! 4. render the SVG for the requested outlook;
//! 5. for PNG/JPEG, reuse the record's persisted raster when the request is
//!    a default rendering, otherwise convert and, for default renderings,
//!    write the raster back to the record (best effort);
//! 6. store the bytes in the response cache unless `no_cache` is set.
//!
//! Rendering and conversion are CPU-bound and run on the blocking pool.
//! Concurrent misses for the same key may render twice; the output is
//! identical and the last write-back wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::badge::render_badge;
use crate::cache::{CacheKey, DEFAULT_TTL, ResponseCache};
use crate::certificate::render_certificate;
use crate::convert::Converter;
use crate::error::{ConversionError, ImageError, RenderError};
use crate::record::{CertificateRecord, DerivedFormat, RecordStore, RenderConfig, validate_identifier};
use crate::request::{ImageFormat, ImageRequest, Outlook};
use crate::template::TemplateSource;

/// Counters describing how requests were served.
#[derive(Debug, Default)]
pub struct RenderStats {
    svg_renders: AtomicU64,
    conversions: AtomicU64,
    cache_hits: AtomicU64,
    persisted_hits: AtomicU64,
}

/// A point-in-time copy of [`RenderStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderStatsSnapshot {
    pub svg_renders: u64,
    pub conversions: u64,
    pub cache_hits: u64,
    pub persisted_hits: u64,
}

impl RenderStats {
    #[must_use]
    pub fn snapshot(&self) -> RenderStatsSnapshot {
        RenderStatsSnapshot {
            svg_renders: self.svg_renders.load(Ordering::Relaxed),
            conversions: self.conversions.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            persisted_hits: self.persisted_hits.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// The bytes of a resolved image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub format: ImageFormat,
    pub bytes: Arc<[u8]>,
}

impl RenderedImage {
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Resolves image requests against the record store and response cache.
pub struct ImageService {
    records: Arc<RecordStore>,
    cache: Arc<ResponseCache>,
    converter: Converter,
    template: TemplateSource,
    cache_ttl: Duration,
    stats: RenderStats,
}

impl std::fmt::Debug for ImageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageService")
            .field("template", &self.template)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

impl ImageService {
    /// Create a service with the default cache TTL and the embedded
    /// certificate template.
    #[must_use]
    pub fn new(records: Arc<RecordStore>, cache: Arc<ResponseCache>, converter: Converter) -> Self {
        Self {
            records,
            cache,
            converter,
            template: TemplateSource::Embedded,
            cache_ttl: DEFAULT_TTL,
            stats: RenderStats::default(),
        }
    }

    /// Use `template` for certificate renders.
    #[must_use]
    pub fn with_template(mut self, template: TemplateSource) -> Self {
        self.template = template;
        self
    }

    /// Keep response-cache entries for `ttl`.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    #[must_use]
    pub fn stats(&self) -> RenderStatsSnapshot {
        self.stats.snapshot()
    }

    /// Resolve an image request for `identifier`.
    ///
    /// # Errors
    ///
    /// - [`ImageError::InvalidRequest`] for a malformed identifier
    /// - [`ImageError::NotFound`] if no record exists
    /// - [`ImageError::Record`], [`ImageError::Render`] or
    ///   [`ImageError::Conversion`] if loading, rendering or rasterizing
    ///   fails. A failed write-back is logged and does not fail the request.
    pub async fn handle_image_request(
        &self,
        identifier: &str,
        request: &ImageRequest,
    ) -> Result<RenderedImage, ImageError> {
        validate_identifier(identifier).map_err(|reason| ImageError::InvalidRequest { reason })?;

        let key = CacheKey::new(identifier, request.format, &request.raw_query);
        if !request.no_cache {
            if let Some(bytes) = self.cache.get(&key).await {
                RenderStats::bump(&self.stats.cache_hits);
                debug!(identifier, format = request.format.as_str(), "response cache hit");
                return Ok(RenderedImage {
                    format: request.format,
                    bytes,
                });
            }
        }

        let record = self
            .records
            .get(identifier)
            .await?
            .ok_or_else(|| ImageError::NotFound {
                id: identifier.to_owned(),
            })?;

        let bytes: Arc<[u8]> = match request.format.derived() {
            None => self.render_svg(&record, request).await?.into(),
            Some(derived) => self.resolve_raster(&record, request, derived).await?.into(),
        };

        if !request.no_cache {
            self.cache
                .set(key, Arc::clone(&bytes), self.cache_ttl)
                .await;
        }

        Ok(RenderedImage {
            format: request.format,
            bytes,
        })
    }

    async fn resolve_raster(
        &self,
        record: &CertificateRecord,
        request: &ImageRequest,
        format: DerivedFormat,
    ) -> Result<Vec<u8>, ImageError> {
        let persistable = request.is_default_rendering();

        if persistable {
            if let Some(bytes) = record.derived_image(format) {
                RenderStats::bump(&self.stats.persisted_hits);
                debug!(identifier = %record.id, format = format.as_str(), "serving persisted derived image");
                return Ok(bytes.to_vec());
            }
        }

        let svg = self.render_svg(record, request).await?;
        let raster = self.convert(svg, format).await?;

        if persistable {
            if let Err(e) = self
                .records
                .update_derived_image(&record.id, format, &raster, record.revision)
                .await
            {
                warn!(
                    identifier = %record.id,
                    format = format.as_str(),
                    error = %e,
                    "failed to persist derived image"
                );
            }
        }

        Ok(raster)
    }

    async fn render_svg(
        &self,
        record: &CertificateRecord,
        request: &ImageRequest,
    ) -> Result<Vec<u8>, RenderError> {
        let config = record
            .render_config
            .clone()
            .unwrap_or_default()
            .merged(&request.overrides);
        let record = record.clone();
        let outlook = request.outlook;
        let template = self.template.clone();

        RenderStats::bump(&self.stats.svg_renders);
        tokio::task::spawn_blocking(move || render(&record, &config, outlook, &template))
            .await
            .map_err(|e| RenderError::Task {
                reason: e.to_string(),
            })?
    }

    async fn convert(&self, svg: Vec<u8>, format: DerivedFormat) -> Result<Vec<u8>, ConversionError> {
        let converter = self.converter.clone();

        RenderStats::bump(&self.stats.conversions);
        tokio::task::spawn_blocking(move || converter.convert(&svg, format, 0, 0))
            .await
            .map_err(|e| ConversionError::Task {
                reason: e.to_string(),
            })?
    }
}

fn render(
    record: &CertificateRecord,
    config: &RenderConfig,
    outlook: Outlook,
    template: &TemplateSource,
) -> Result<Vec<u8>, RenderError> {
    match outlook {
        Outlook::Badge => Ok(render_badge(record, config)),
        Outlook::Certificate => render_certificate(record, config, template),
    }
}
