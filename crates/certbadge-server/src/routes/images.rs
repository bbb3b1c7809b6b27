//! Image route: `GET /badges/{id}`
//!
//! Query parameters select the format (`svg`, `png`, `jpg`), the outlook
//! (`badge`, `certificate`), cache bypass (`no_cache`) and per-request
//! render overrides. See [`certbadge_core::request::ImageRequest`].

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use certbadge_core::request::ImageRequest;

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/badges` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/{id}", get(get_image))
}

/// Serve the badge or certificate image for a record.
async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response, AppError> {
    let request = ImageRequest::from_params(
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        raw_query.as_deref(),
    )?;

    let image = state.images.handle_image_request(&id, &request).await?;

    let cache_control = format!("public, max-age={}", state.images.cache_ttl().as_secs());
    Ok((
        [(CONTENT_TYPE, image.content_type())],
        [(CACHE_CONTROL, cache_control)],
        Body::from(Bytes::copy_from_slice(&image.bytes)),
    )
        .into_response())
}
