//! Certificate renderer.
//!
//! A certificate is a 170x200 card: a colored top bar labelled with the
//! issuer, the certificate name broken over up to three lines, an optional
//! specialty domain line, the organization logo, and a fixed slogan. The
//! specialty domain is shown on its own line only, never in the top bar. Geometry lives in
//! the template; this module resolves the brand colors and text that fill
//! its slots.

use std::borrow::Cow;

use crate::error::RenderError;
use crate::record::{CertificateRecord, RenderConfig};
use svg::node::element::Text as SvgText;

use crate::escape::{attribute, escape_xml};
use crate::template::{CertificateTemplate, Slot, TemplateSource};

pub const DEFAULT_CERTIFICATE_NAME: &str = "Verified Dependencies";
pub const SLOGAN: &str = "Trusted Software Supply Chain";

pub const CANVAS_WIDTH: u32 = 170;
pub const CANVAS_HEIGHT: u32 = 200;

/// Issuers longer than this are cut to fit the top bar.
const MAX_TOP_LABEL_CHARS: usize = 26;

pub const DEFAULT_LOGO_COLOR: &str = "#2563eb";
pub const DEFAULT_BACKGROUND_COLOR: &str = "#ffffff";
pub const DEFAULT_BAR_COLOR: &str = "#1e3a8a";
pub const DEFAULT_TOP_LABEL_COLOR: &str = "#ffffff";
pub const DEFAULT_GRADIENT_START: &str = "#ffffff";
pub const DEFAULT_GRADIENT_END: &str = "#dbeafe";
pub const DEFAULT_BORDER_COLOR: &str = "#1e3a8a";
pub const DEFAULT_CERT_NAME_COLOR: &str = "#1e293b";

/// Resolved brand colors for one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandColors {
    pub logo: String,
    pub background: String,
    pub bar: String,
    pub top_label: String,
    pub gradient_start: String,
    pub gradient_end: String,
    pub border: String,
    pub cert_name: String,
}

impl BrandColors {
    /// Resolve each color independently, falling back to its default.
    #[must_use]
    pub fn resolve(config: &RenderConfig) -> Self {
        let pick = |value: &Option<String>, default: &str| {
            value.clone().unwrap_or_else(|| default.to_owned())
        };
        Self {
            logo: pick(&config.logo_color, DEFAULT_LOGO_COLOR),
            background: pick(&config.background_color, DEFAULT_BACKGROUND_COLOR),
            bar: pick(&config.bar_color, DEFAULT_BAR_COLOR),
            top_label: pick(&config.top_label_color, DEFAULT_TOP_LABEL_COLOR),
            gradient_start: pick(&config.gradient_start, DEFAULT_GRADIENT_START),
            gradient_end: pick(&config.gradient_end, DEFAULT_GRADIENT_END),
            border: pick(&config.border_color, DEFAULT_BORDER_COLOR),
            cert_name: pick(&config.cert_name_color, DEFAULT_CERT_NAME_COLOR),
        }
    }
}

/// Split a certificate name into three display lines.
///
/// Splits on whitespace, keeps the first three words and drops the rest.
/// Missing lines are empty.
#[must_use]
pub fn split_name(name: &str) -> [&str; 3] {
    let mut lines = [""; 3];
    for (line, word) in lines.iter_mut().zip(name.split_whitespace()) {
        *line = word;
    }
    lines
}

/// Everything the template slots are filled from.
struct CertificateView<'a> {
    title: String,
    top_label: String,
    name_lines: [&'a str; 3],
    specialty_domain: Option<&'a str>,
    colors: BrandColors,
}

impl<'a> CertificateView<'a> {
    fn new(record: &'a CertificateRecord, config: &RenderConfig) -> Self {
        let name = match record.certificate_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => DEFAULT_CERTIFICATE_NAME,
        };
        let specialty_domain = record
            .specialty_domain
            .as_deref()
            .map(str::trim)
            .filter(|domain| !domain.is_empty());

        let issuer = record.issuer.trim();
        let mut top_label: String = issuer.chars().take(MAX_TOP_LABEL_CHARS).collect();
        if issuer.chars().count() > MAX_TOP_LABEL_CHARS {
            top_label.truncate(top_label.trim_end().len());
            top_label.push('…');
        }

        Self {
            title: format!("{name}: {} {}", record.software_name, record.software_version),
            top_label: top_label.to_uppercase(),
            name_lines: split_name(name),
            specialty_domain,
            colors: BrandColors::resolve(config),
        }
    }

    fn slot(&self, slot: Slot) -> Cow<'_, str> {
        match slot {
            Slot::Width => Cow::Owned(CANVAS_WIDTH.to_string()),
            Slot::Height => Cow::Owned(CANVAS_HEIGHT.to_string()),
            Slot::Title => escape_xml(&self.title),
            Slot::BackgroundColor => escape_xml(&self.colors.background),
            Slot::BarColor => escape_xml(&self.colors.bar),
            Slot::BorderColor => escape_xml(&self.colors.border),
            Slot::GradientStart => escape_xml(&self.colors.gradient_start),
            Slot::GradientEnd => escape_xml(&self.colors.gradient_end),
            Slot::TopLabelColor => escape_xml(&self.colors.top_label),
            Slot::TopLabel => escape_xml(&self.top_label),
            Slot::CertNameColor => escape_xml(&self.colors.cert_name),
            Slot::NameLine1 => escape_xml(self.name_lines[0]),
            Slot::NameLine2 => escape_xml(self.name_lines[1]),
            Slot::NameLine3 => escape_xml(self.name_lines[2]),
            Slot::SpecialtyLine => match self.specialty_domain {
                Some(domain) => Cow::Owned(
                    SvgText::new(domain)
                        .set("x", 85)
                        .set("y", 117)
                        .set("text-anchor", "middle")
                        .set("font-family", "Verdana,Geneva,DejaVu Sans,sans-serif")
                        .set("font-size", 9)
                        .set("font-style", "italic")
                        .set("fill", attribute(&self.colors.cert_name))
                        .to_string(),
                ),
                None => Cow::Borrowed(""),
            },
            Slot::LogoColor => escape_xml(&self.colors.logo),
            Slot::Slogan => Cow::Borrowed(SLOGAN),
        }
    }
}

/// Render a certificate with an already loaded template.
#[must_use]
pub fn render_with_template(
    record: &CertificateRecord,
    config: &RenderConfig,
    template: &CertificateTemplate,
) -> Vec<u8> {
    let view = CertificateView::new(record, config);
    template.render(|slot| view.slot(slot)).into_bytes()
}

/// Render the certificate SVG for `record`, loading the template from
/// `source`.
///
/// # Errors
///
/// Returns [`RenderError::TemplateRead`] if a file template cannot be read.
pub fn render_certificate(
    record: &CertificateRecord,
    config: &RenderConfig,
    source: &TemplateSource,
) -> Result<Vec<u8>, RenderError> {
    let template = source.load()?;
    Ok(render_with_template(record, config, &template))
}
