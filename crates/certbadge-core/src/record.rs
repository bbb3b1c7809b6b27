//! Certificate records and the record store.
//!
//! A [`CertificateRecord`] is one row of the single certificate table: the
//! display attributes shown on badges and certificates, an optional
//! [`RenderConfig`], and the derived PNG/JPEG bytes cached from the default
//! badge rendering. Records are persisted as JSON documents at
//! `certificates/<id>` through a [`StorageBackend`].
//!
//! Every [`RecordStore::update`] bumps the record's `revision` and clears the
//! derived images, so a stale raster is never served after an edit.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use certbadge_storage::StorageBackend;

use crate::error::RecordError;
use crate::overrides::{FONT_SIZE_RANGE, is_valid_color, is_valid_logo_url};

/// Storage prefix for certificate records.
const RECORD_PREFIX: &str = "certificates/";

/// Maximum identifier length.
const MAX_ID_LEN: usize = 128;

/// Lifecycle status of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    #[default]
    Valid,
    Expired,
    Revoked,
}

/// Badge rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Style {
    #[default]
    #[serde(rename = "flat")]
    Flat,
    #[serde(rename = "3d")]
    ThreeD,
}

impl FromStr for Style {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            "3d" => Ok(Self::ThreeD),
            _ => Err(()),
        }
    }
}

/// Visual configuration attached to a record.
///
/// Every field is optional; `None` means "use the renderer default". The
/// badge fields can also be overridden per request (see
/// [`crate::overrides::RenderOverrides`]); the brand colors only apply to
/// the certificate outlook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_left: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_right: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color_left: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color_right: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_label_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_name_color: Option<String>,
}

impl RenderConfig {
    /// Check the stored configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), RecordError> {
        if let Some(size) = self.font_size {
            if !FONT_SIZE_RANGE.contains(&size) {
                return Err(RecordError::Invalid {
                    reason: format!(
                        "font_size must be between {} and {}, got {size}",
                        FONT_SIZE_RANGE.start(),
                        FONT_SIZE_RANGE.end()
                    ),
                });
            }
        }

        let colors = [
            ("color_left", &self.color_left),
            ("color_right", &self.color_right),
            ("text_color", &self.text_color),
            ("text_color_left", &self.text_color_left),
            ("text_color_right", &self.text_color_right),
            ("logo_color", &self.logo_color),
            ("background_color", &self.background_color),
            ("bar_color", &self.bar_color),
            ("top_label_color", &self.top_label_color),
            ("gradient_start", &self.gradient_start),
            ("gradient_end", &self.gradient_end),
            ("border_color", &self.border_color),
            ("cert_name_color", &self.cert_name_color),
        ];
        for (field, value) in colors {
            if let Some(color) = value {
                if !is_valid_color(color) {
                    return Err(RecordError::Invalid {
                        reason: format!("{field} is not a valid color: '{color}'"),
                    });
                }
            }
        }

        if let Some(logo) = &self.logo {
            if !is_valid_logo_url(logo) {
                return Err(RecordError::Invalid {
                    reason: "logo must be an http(s) or data:image URL".to_owned(),
                });
            }
        }

        Ok(())
    }
}

/// Raster formats that can be persisted on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedFormat {
    Png,
    Jpg,
}

impl DerivedFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }
}

/// A persisted certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Unique, immutable identifier. The lookup key for every image request.
    pub id: String,
    pub status: CertificateStatus,
    pub issuer: String,
    pub issued_at: NaiveDate,
    /// Optional expiry date; see [`CertificateRecord::effective_status`].
    #[serde(default)]
    pub expires_at: Option<NaiveDate>,
    pub software_name: String,
    pub software_version: String,
    #[serde(default)]
    pub software_url: Option<String>,
    /// Display name; badges fall back to the software version when unset.
    #[serde(default)]
    pub certificate_name: Option<String>,
    #[serde(default)]
    pub specialty_domain: Option<String>,
    #[serde(default)]
    pub render_config: Option<RenderConfig>,

    /// Incremented by every update. Derived-image write-backs carry the
    /// revision they were rendered from.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub png: Option<Vec<u8>>,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub jpg: Option<Vec<u8>>,
}

impl CertificateRecord {
    /// Build a new `valid` record with the required attributes.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        issuer: impl Into<String>,
        issued_at: NaiveDate,
        software_name: impl Into<String>,
        software_version: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: CertificateStatus::Valid,
            issuer: issuer.into(),
            issued_at,
            expires_at: None,
            software_name: software_name.into(),
            software_version: software_version.into(),
            software_url: None,
            certificate_name: None,
            specialty_domain: None,
            render_config: None,
            revision: 0,
            created_at: now,
            updated_at: now,
            png: None,
            jpg: None,
        }
    }

    /// Status after applying the expiry date: a `valid` record whose expiry
    /// date lies before `today` reports `expired`.
    #[must_use]
    pub fn effective_status(&self, today: NaiveDate) -> CertificateStatus {
        match (self.status, self.expires_at) {
            (CertificateStatus::Valid, Some(expiry)) if expiry < today => {
                CertificateStatus::Expired
            }
            (status, _) => status,
        }
    }

    /// The text shown in a badge's value segment.
    ///
    /// A blank certificate name falls back to the software version, the same
    /// way the certificate renderer falls back to its default name.
    #[must_use]
    pub fn display_value(&self) -> &str {
        match self.certificate_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.software_version,
        }
    }

    /// Persisted raster bytes for `format`, if any.
    #[must_use]
    pub fn derived_image(&self, format: DerivedFormat) -> Option<&[u8]> {
        match format {
            DerivedFormat::Png => self.png.as_deref(),
            DerivedFormat::Jpg => self.jpg.as_deref(),
        }
    }

    fn set_derived_image(&mut self, format: DerivedFormat, bytes: Vec<u8>) {
        match format {
            DerivedFormat::Png => self.png = Some(bytes),
            DerivedFormat::Jpg => self.jpg = Some(bytes),
        }
    }

    fn clear_derived_images(&mut self) {
        self.png = None;
        self.jpg = None;
    }

    /// Validate the record's attributes.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), RecordError> {
        validate_identifier(&self.id).map_err(|reason| RecordError::Invalid { reason })?;

        if self.issuer.trim().is_empty() {
            return Err(RecordError::Invalid {
                reason: "issuer must not be empty".to_owned(),
            });
        }
        if self.software_name.trim().is_empty() {
            return Err(RecordError::Invalid {
                reason: "software_name must not be empty".to_owned(),
            });
        }
        if let Some(expiry) = self.expires_at {
            if expiry < self.issued_at {
                return Err(RecordError::Invalid {
                    reason: "expires_at must not precede issued_at".to_owned(),
                });
            }
        }
        if let Some(config) = &self.render_config {
            config.validate()?;
        }
        Ok(())
    }
}

/// Check identifier syntax.
///
/// Identifiers are 1 to 128 characters of ASCII alphanumerics, `-`, `_` and
/// `.`, and never contain `..`.
///
/// # Errors
///
/// Returns a message safe to show to API clients.
pub fn validate_identifier(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("identifier must not be empty".to_owned());
    }
    if id.len() > MAX_ID_LEN {
        return Err(format!(
            "identifier exceeds maximum length of {MAX_ID_LEN} characters"
        ));
    }
    if id.contains("..") {
        return Err("identifier must not contain '..'".to_owned());
    }
    if !id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
    {
        return Err(
            "identifier may only contain alphanumeric characters, '-', '_', and '.'".to_owned(),
        );
    }
    Ok(())
}

/// Persistence for certificate records.
///
/// Read-modify-write operations are serialized by an internal lock so an
/// admin update and a derived-image write-back cannot interleave.
pub struct RecordStore {
    storage: Arc<dyn StorageBackend>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Create a record store over the given backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    fn key(id: &str) -> String {
        format!("{RECORD_PREFIX}{id}")
    }

    async fn load(&self, id: &str) -> Result<Option<CertificateRecord>, RecordError> {
        let Some(bytes) = self.storage.get(&Self::key(id)).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| RecordError::Corrupt {
                id: id.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn store(&self, record: &CertificateRecord) -> Result<(), RecordError> {
        let bytes = serde_json::to_vec(record).map_err(|e| RecordError::Corrupt {
            id: record.id.clone(),
            reason: e.to_string(),
        })?;
        self.storage.put(&Self::key(&record.id), &bytes).await?;
        Ok(())
    }

    /// Fetch a record by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Storage`] or [`RecordError::Corrupt`] if the
    /// record cannot be read.
    pub async fn get(&self, id: &str) -> Result<Option<CertificateRecord>, RecordError> {
        self.load(id).await
    }

    /// Persist a new record. Revision starts at 1 and derived images are
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Invalid`] if validation fails and
    /// [`RecordError::AlreadyExists`] if the identifier is taken.
    pub async fn create(
        &self,
        mut record: CertificateRecord,
    ) -> Result<CertificateRecord, RecordError> {
        record.validate()?;
        let _guard = self.write_lock.lock().await;

        if self.storage.exists(&Self::key(&record.id)).await? {
            return Err(RecordError::AlreadyExists { id: record.id });
        }

        let now = Utc::now();
        record.revision = 1;
        record.created_at = now;
        record.updated_at = now;
        record.clear_derived_images();
        self.store(&record).await?;

        info!(identifier = %record.id, "certificate created");
        Ok(record)
    }

    /// Replace an existing record's attributes.
    ///
    /// Keeps the original creation time, bumps the revision and clears both
    /// derived images.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Invalid`] if validation fails and
    /// [`RecordError::NotFound`] if the record does not exist.
    pub async fn update(
        &self,
        mut record: CertificateRecord,
    ) -> Result<CertificateRecord, RecordError> {
        record.validate()?;
        let _guard = self.write_lock.lock().await;

        let existing = self
            .load(&record.id)
            .await?
            .ok_or_else(|| RecordError::NotFound {
                id: record.id.clone(),
            })?;

        record.created_at = existing.created_at;
        record.updated_at = Utc::now();
        record.revision = existing.revision.saturating_add(1);
        record.clear_derived_images();
        self.store(&record).await?;

        info!(identifier = %record.id, revision = record.revision, "certificate updated");
        Ok(record)
    }

    /// Persist rendered raster bytes on a record.
    ///
    /// `revision` is the revision the bytes were rendered from. If the record
    /// has been updated since, the write is skipped and `Ok(false)` returned.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] if the record was deleted, or a
    /// storage error.
    pub async fn update_derived_image(
        &self,
        id: &str,
        format: DerivedFormat,
        bytes: &[u8],
        revision: u64,
    ) -> Result<bool, RecordError> {
        let _guard = self.write_lock.lock().await;

        let mut record = self
            .load(id)
            .await?
            .ok_or_else(|| RecordError::NotFound { id: id.to_owned() })?;

        if record.revision != revision {
            debug!(
                identifier = %id,
                rendered_from = revision,
                current = record.revision,
                "skipping stale derived image write-back"
            );
            return Ok(false);
        }

        record.set_derived_image(format, bytes.to_vec());
        self.store(&record).await?;
        debug!(identifier = %id, format = format.as_str(), size = bytes.len(), "derived image persisted");
        Ok(true)
    }

    /// All records, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns a storage or decoding error.
    pub async fn list(&self) -> Result<Vec<CertificateRecord>, RecordError> {
        let keys = self.storage.list(RECORD_PREFIX).await?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let id = key.trim_start_matches(RECORD_PREFIX);
            if let Some(record) = self.load(id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] if the record does not exist.
    pub async fn delete(&self, id: &str) -> Result<(), RecordError> {
        let _guard = self.write_lock.lock().await;
        let key = Self::key(id);
        if !self.storage.exists(&key).await? {
            return Err(RecordError::NotFound { id: id.to_owned() });
        }
        self.storage.delete(&key).await?;
        info!(identifier = %id, "certificate deleted");
        Ok(())
    }
}

/// Serde adapter storing optional byte buffers as base64 strings.
mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => s.serialize_some(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}
