//! Router assembly.

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware as axum_mw;
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::admin_auth_middleware;
use crate::routes;
use crate::state::AppState;

/// Maximum image requests rendered concurrently.
const IMAGE_CONCURRENCY_LIMIT: usize = 64;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Admin routes go through the API-key middleware.
    let admin_routes = Router::new()
        .nest("/v1/certificates", routes::certificates::router())
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            admin_auth_middleware,
        ));

    // Rendering is CPU-bound; bound the number of in-flight image requests.
    let image_routes = Router::new()
        .nest("/badges", routes::images::router())
        .layer(ConcurrencyLimitLayer::new(IMAGE_CONCURRENCY_LIMIT));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
        ]);

    Router::new()
        .merge(image_routes)
        .merge(admin_routes)
        .nest("/v1/sys", routes::sys::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
