//! End-to-end tests driving the router in-process.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use certbadge_core::convert::Converter;
use certbadge_server::app::build_router;
use certbadge_server::config::ServerConfig;
use certbadge_server::state::AppState;
use certbadge_storage::MemoryBackend;

const API_KEY: &str = "test-admin-key";

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Reply {
    fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn header(&self, name: header::HeaderName) -> &str {
        self.headers.get(name).unwrap().to_str().unwrap()
    }
}

fn app_with(config: &ServerConfig) -> Router {
    let state = AppState::new(
        Arc::new(MemoryBackend::new()),
        Converter::without_fonts(),
        config,
    );
    build_router(Arc::new(state))
}

fn app() -> Router {
    app_with(&ServerConfig {
        admin_api_key: Some(API_KEY.to_owned()),
        ..ServerConfig::default()
    })
}

async fn send(app: &Router, req: Request<Body>) -> Reply {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        body,
    }
}

async fn get(app: &Router, uri: &str) -> Reply {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn admin(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY);
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send(app, req).await
}

fn certificate(id: &str) -> Value {
    json!({
        "id": id,
        "issuer": "Open Compliance Board",
        "issued_at": "2025-03-01",
        "software_name": "acme-core",
        "software_version": "1.4.0",
        "specialty_domain": "Cryptography",
        "render_config": { "font_size": 12 }
    })
}

async fn seeded() -> Router {
    let app = app();
    let reply = admin(&app, Method::POST, "/v1/certificates", Some(certificate("acme-core"))).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    app
}

// ── Images ───────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_identifier_is_404() {
    let app = app();
    let reply = get(&app, "/badges/nobody").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json()["error"], "not_found");
}

#[tokio::test]
async fn malformed_identifier_is_400() {
    let app = seeded().await;
    let reply = get(&app, "/badges/acme..core").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsupported_format_is_400() {
    let app = seeded().await;
    let reply = get(&app, "/badges/acme-core?format=gif").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json()["error"], "bad_request");
}

#[tokio::test]
async fn svg_badge_headers() {
    let app = seeded().await;
    let reply = get(&app, "/badges/acme-core").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.header(header::CONTENT_TYPE), "image/svg+xml");
    assert_eq!(reply.header(header::CACHE_CONTROL), "public, max-age=300");
    assert_eq!(reply.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");
    assert!(reply.text().contains("<svg "));
}

#[tokio::test]
async fn style_override_flat_and_3d() {
    let app = seeded().await;
    let flat = get(&app, "/badges/acme-core?style=flat").await;
    assert!(!flat.text().contains("<filter"));

    let three_d = get(&app, "/badges/acme-core?style=3d").await;
    assert!(three_d.text().contains("<filter"));
}

#[tokio::test]
async fn out_of_range_font_size_is_ignored() {
    let app = seeded().await;
    let reply = get(&app, "/badges/acme-core?font_size=999").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.text().contains(r#"font-size="12""#));
}

#[tokio::test]
async fn certificate_outlook_shows_specialty_domain() {
    let app = seeded().await;
    let reply = get(&app, "/badges/acme-core?outlook=certificate").await;
    assert_eq!(reply.status, StatusCode::OK);
    let svg = reply.text();
    assert_eq!(svg.matches("Cryptography").count(), 1);
    assert!(!svg.contains("CRYPTOGRAPHY"));
    assert!(svg.contains(">OPEN COMPLIANCE BOARD</text>"));
}

#[tokio::test]
async fn jpg_is_persisted_and_reused() {
    let app = seeded().await;

    let first = get(&app, "/badges/acme-core?format=jpg&no_cache=true").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header(header::CONTENT_TYPE), "image/jpeg");
    assert_eq!(&first.body[..2], &[0xFF, 0xD8]);

    let detail = admin(&app, Method::GET, "/v1/certificates/acme-core", None).await;
    assert_eq!(detail.json()["has_jpg"], true);
    assert_eq!(detail.json()["has_png"], false);

    let second = get(&app, "/badges/acme-core?format=jpg&no_cache=true").await;
    assert_eq!(first.body, second.body);

    let health = get(&app, "/v1/sys/health").await.json();
    assert_eq!(health["render"]["conversions"], 1);
    assert_eq!(health["render"]["persisted_hits"], 1);
}

#[tokio::test]
async fn png_signature() {
    let app = seeded().await;
    let reply = get(&app, "/badges/acme-core?format=PNG").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.header(header::CONTENT_TYPE), "image/png");
    assert_eq!(&reply.body[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn repeated_request_hits_response_cache() {
    let app = seeded().await;
    let first = get(&app, "/badges/acme-core?color_right=%23e05d44").await;
    let second = get(&app, "/badges/acme-core?color_right=%23e05d44").await;
    assert_eq!(first.body, second.body);
    assert!(first.text().contains("#e05d44"));

    let health = get(&app, "/v1/sys/health").await.json();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["render"]["svg_renders"], 1);
    assert_eq!(health["render"]["cache_hits"], 1);
    assert_eq!(health["cache_entries"], 1);
}

// ── Admin API ────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_requires_api_key() {
    let app = seeded().await;

    let missing = get(&app, "/v1/certificates").await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json()["error"], "unauthorized");

    let wrong = send(
        &app,
        Request::get("/v1/certificates")
            .header("x-api-key", "not-the-key")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let ok = admin(&app, Method::GET, "/v1/certificates", None).await;
    assert_eq!(ok.status, StatusCode::OK);
}

#[tokio::test]
async fn admin_disabled_without_configured_key() {
    let app = app_with(&ServerConfig::default());
    let reply = admin(&app, Method::GET, "/v1/certificates", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_conflict_and_list() {
    let app = seeded().await;

    let dup = admin(&app, Method::POST, "/v1/certificates", Some(certificate("acme-core"))).await;
    assert_eq!(dup.status, StatusCode::CONFLICT);

    let created = admin(&app, Method::POST, "/v1/certificates", Some(certificate("acme-cli"))).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["revision"], 1);

    let list = admin(&app, Method::GET, "/v1/certificates", None).await.json();
    let ids: Vec<&str> = list["certificates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["acme-cli", "acme-core"]);
}

#[tokio::test]
async fn create_rejects_invalid_record() {
    let app = app();
    let mut body = certificate("acme-core");
    body["render_config"]["font_size"] = json!(40);
    let reply = admin(&app, Method::POST, "/v1/certificates", Some(body)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_discards_persisted_rasters() {
    let app = seeded().await;
    get(&app, "/badges/acme-core?format=png").await;
    let before = admin(&app, Method::GET, "/v1/certificates/acme-core", None).await;
    assert_eq!(before.json()["has_png"], true);

    let mut body = certificate("acme-core");
    body["software_version"] = json!("1.5.0");
    let updated = admin(&app, Method::PUT, "/v1/certificates/acme-core", Some(body)).await;
    assert_eq!(updated.status, StatusCode::OK);
    let updated = updated.json();
    assert_eq!(updated["revision"], 2);
    assert_eq!(updated["has_png"], false);
    assert_eq!(updated["software_version"], "1.5.0");
}

#[tokio::test]
async fn update_unknown_is_404() {
    let app = app();
    let reply = admin(
        &app,
        Method::PUT,
        "/v1/certificates/ghost",
        Some(certificate("ignored")),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_then_image_is_404() {
    let app = seeded().await;

    let deleted = admin(&app, Method::DELETE, "/v1/certificates/acme-core", None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let again = admin(&app, Method::DELETE, "/v1/certificates/acme-core", None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let image = get(&app, "/badges/acme-core?no_cache=1").await;
    assert_eq!(image.status, StatusCode::NOT_FOUND);
}
