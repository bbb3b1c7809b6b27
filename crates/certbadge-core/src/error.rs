//! Error types for `certbadge-core`.
//!
//! Each variant carries enough context to diagnose the problem from a log
//! line. None of these messages are meant for HTTP clients verbatim except
//! the validation variants; the server decides what to expose.

use certbadge_storage::StorageError;

/// Errors from the certificate record store.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// No record exists with this identifier.
    #[error("certificate not found: {id}")]
    NotFound { id: String },

    /// A record with this identifier already exists.
    #[error("certificate already exists: {id}")]
    AlreadyExists { id: String },

    /// The record failed validation.
    #[error("invalid certificate record: {reason}")]
    Invalid { reason: String },

    /// The stored document could not be decoded or encoded.
    #[error("certificate record '{id}' is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    /// The underlying storage backend returned an error.
    #[error("record storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from the certificate template parser.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TemplateError {
    /// A `{{` was never closed.
    #[error("unterminated placeholder starting at byte {offset}")]
    Unterminated { offset: usize },

    /// A placeholder names a slot the renderer does not provide.
    #[error("unknown placeholder '{name}'")]
    UnknownSlot { name: String },

    /// The document is not an SVG document.
    #[error("template is not an SVG document")]
    NotSvg,
}

/// Errors from the badge and certificate renderers.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The configured template asset could not be read.
    #[error("failed to read template '{path}': {reason}")]
    TemplateRead { path: String, reason: String },

    /// Neither the configured nor the embedded template is usable.
    #[error("certificate template unavailable: {0}")]
    Template(#[from] TemplateError),

    /// The blocking render task did not complete.
    #[error("render task failed: {reason}")]
    Task { reason: String },
}

/// Errors from SVG rasterization.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The SVG document could not be parsed.
    #[error("failed to parse SVG: {reason}")]
    Parse { reason: String },

    /// A pixmap of the requested size could not be allocated.
    #[error("cannot allocate a {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },

    /// Encoding the pixmap failed.
    #[error("failed to encode {format}: {reason}")]
    Encode { format: String, reason: String },

    /// The blocking conversion task did not complete.
    #[error("conversion task failed: {reason}")]
    Task { reason: String },
}

/// Errors from resolving an image request.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The request itself is malformed. The message is safe to show.
    #[error("{reason}")]
    InvalidRequest { reason: String },

    /// No record exists for the requested identifier.
    #[error("certificate not found: {id}")]
    NotFound { id: String },

    /// Rendering the SVG failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Rasterizing the SVG failed.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Reading the record failed.
    #[error(transparent)]
    Record(#[from] RecordError),
}
