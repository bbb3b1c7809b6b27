//! Admin certificate routes: `/v1/certificates/*`
//!
//! CRUD over certificate records. Responses never include the persisted
//! raster bytes, only whether they exist.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use certbadge_core::record::{CertificateRecord, CertificateStatus, RenderConfig};

use crate::error::AppError;
use crate::state::AppState;

/// Build the `/v1/certificates` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_certificates).post(create_certificate))
        .route(
            "/{id}",
            get(read_certificate)
                .put(update_certificate)
                .delete(delete_certificate),
        )
}

// ── Request / Response types ─────────────────────────────────────────

/// Editable certificate attributes.
#[derive(Debug, Deserialize)]
pub struct CertificateFields {
    #[serde(default)]
    pub status: CertificateStatus,
    pub issuer: String,
    pub issued_at: NaiveDate,
    #[serde(default)]
    pub expires_at: Option<NaiveDate>,
    pub software_name: String,
    pub software_version: String,
    #[serde(default)]
    pub software_url: Option<String>,
    #[serde(default)]
    pub certificate_name: Option<String>,
    #[serde(default)]
    pub specialty_domain: Option<String>,
    #[serde(default)]
    pub render_config: Option<RenderConfig>,
}

impl CertificateFields {
    fn into_record(self, id: String) -> CertificateRecord {
        let mut record = CertificateRecord::new(
            id,
            self.issuer,
            self.issued_at,
            self.software_name,
            self.software_version,
        );
        record.status = self.status;
        record.expires_at = self.expires_at;
        record.software_url = self.software_url;
        record.certificate_name = self.certificate_name;
        record.specialty_domain = self.specialty_domain;
        record.render_config = self.render_config;
        record
    }
}

/// Request body for `POST /v1/certificates`.
#[derive(Debug, Deserialize)]
pub struct CreateCertificateRequest {
    pub id: String,
    #[serde(flatten)]
    pub fields: CertificateFields,
}

/// A certificate record without its image bytes.
#[derive(Debug, Serialize)]
pub struct CertificateResponse {
    pub id: String,
    /// Stored status.
    pub status: CertificateStatus,
    /// Status after applying the expiry date.
    pub effective_status: CertificateStatus,
    pub issuer: String,
    pub issued_at: NaiveDate,
    pub expires_at: Option<NaiveDate>,
    pub software_name: String,
    pub software_version: String,
    pub software_url: Option<String>,
    pub certificate_name: Option<String>,
    pub specialty_domain: Option<String>,
    pub render_config: Option<RenderConfig>,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub has_png: bool,
    pub has_jpg: bool,
}

impl From<CertificateRecord> for CertificateResponse {
    fn from(record: CertificateRecord) -> Self {
        let effective_status = record.effective_status(Utc::now().date_naive());
        Self {
            effective_status,
            status: record.status,
            has_png: record.png.is_some(),
            has_jpg: record.jpg.is_some(),
            id: record.id,
            issuer: record.issuer,
            issued_at: record.issued_at,
            expires_at: record.expires_at,
            software_name: record.software_name,
            software_version: record.software_version,
            software_url: record.software_url,
            certificate_name: record.certificate_name,
            specialty_domain: record.specialty_domain,
            render_config: record.render_config,
            revision: record.revision,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Response body for `GET /v1/certificates`.
#[derive(Debug, Serialize)]
pub struct CertificateListResponse {
    pub certificates: Vec<CertificateResponse>,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// List all certificates ordered by identifier.
async fn list_certificates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CertificateListResponse>, AppError> {
    let certificates = state
        .records
        .list()
        .await?
        .into_iter()
        .map(CertificateResponse::from)
        .collect();

    Ok(Json(CertificateListResponse { certificates }))
}

/// Create a certificate.
async fn create_certificate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCertificateRequest>,
) -> Result<(StatusCode, Json<CertificateResponse>), AppError> {
    let record = state
        .records
        .create(body.fields.into_record(body.id))
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Read one certificate.
async fn read_certificate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CertificateResponse>, AppError> {
    let record = state
        .records
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("certificate not found: {id}")))?;

    Ok(Json(record.into()))
}

/// Replace a certificate's attributes. Persisted rasters are discarded.
async fn update_certificate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<CertificateFields>,
) -> Result<Json<CertificateResponse>, AppError> {
    let record = state.records.update(body.into_record(id)).await?;
    Ok(Json(record.into()))
}

/// Delete a certificate.
async fn delete_certificate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.records.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
