//! SVG rasterization.
//!
//! Renders SVG bytes with `resvg` onto a white background and encodes the
//! pixmap as PNG (via `tiny-skia`) or JPEG (via `image`). Fonts are loaded
//! once per [`Converter`] and shared by every conversion.

use std::sync::Arc;

use image::ImageEncoder;
use image::codecs::jpeg::JpegEncoder;
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg::{self, fontdb};
use tracing::debug;

use crate::error::ConversionError;
use crate::record::DerivedFormat;

/// JPEG quality used for derived images.
const JPEG_QUALITY: u8 = 90;

/// Rasterizes SVG documents.
#[derive(Clone)]
pub struct Converter {
    fontdb: Arc<fontdb::Database>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::with_system_fonts()
    }
}

impl Converter {
    /// A converter using the fonts installed on this machine.
    #[must_use]
    pub fn with_system_fonts() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        debug!(faces = db.len(), "loaded system fonts for rasterization");
        Self { fontdb: Arc::new(db) }
    }

    /// A converter with no fonts. Text is skipped; shapes still render.
    #[must_use]
    pub fn without_fonts() -> Self {
        Self {
            fontdb: Arc::new(fontdb::Database::new()),
        }
    }

    /// Rasterize `svg` into `format`.
    ///
    /// A `width` or `height` of 0 keeps the document's intrinsic size along
    /// that axis; otherwise the drawing is scaled to fit exactly.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Parse`] for invalid SVG,
    /// [`ConversionError::Pixmap`] for an empty or oversized target, and
    /// [`ConversionError::Encode`] if encoding fails.
    pub fn convert(
        &self,
        svg: &[u8],
        format: DerivedFormat,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, ConversionError> {
        let pixmap = self.rasterize(svg, width, height)?;
        match format {
            DerivedFormat::Png => pixmap.encode_png().map_err(|e| ConversionError::Encode {
                format: format.as_str().to_owned(),
                reason: e.to_string(),
            }),
            DerivedFormat::Jpg => encode_jpeg(&pixmap),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn rasterize(&self, svg: &[u8], width: u32, height: u32) -> Result<Pixmap, ConversionError> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);

        let tree = usvg::Tree::from_data(svg, &options).map_err(|e| ConversionError::Parse {
            reason: e.to_string(),
        })?;

        let size = tree.size();
        let target_w = if width == 0 { size.width().ceil() as u32 } else { width };
        let target_h = if height == 0 { size.height().ceil() as u32 } else { height };

        let mut pixmap = Pixmap::new(target_w, target_h).ok_or(ConversionError::Pixmap {
            width: target_w,
            height: target_h,
        })?;
        pixmap.fill(Color::WHITE);

        let transform = Transform::from_scale(
            target_w as f32 / size.width(),
            target_h as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());
        Ok(pixmap)
    }
}

/// Encode an opaque pixmap as JPEG. The background fill makes every pixel
/// opaque, so premultiplied and straight RGB agree and alpha can be dropped.
fn encode_jpeg(pixmap: &Pixmap) -> Result<Vec<u8>, ConversionError> {
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .write_image(
            &rgb,
            pixmap.width(),
            pixmap.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| ConversionError::Encode {
            format: DerivedFormat::Jpg.as_str().to_owned(),
            reason: e.to_string(),
        })?;
    Ok(out)
}
