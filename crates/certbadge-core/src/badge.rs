//! Badge renderer.
//!
//! A badge is two segments, 20px high: a fixed-width block on the left
//! carrying a two-tone shield logo (or the configured logo image) and a
//! colored block on the right showing the record's display value. The
//! label text segment is never rendered; width is computed with an empty
//! label, which always selects the logo-only layout.

use svg::Document;
use svg::node::element::{
    ClipPath, Definitions, Filter, FilterEffectDropShadow, Group, Image, LinearGradient, Path,
    Rectangle, Stop, Text as SvgText, Title,
};

use crate::layout::{LOGO_BLOCK_WIDTH, compute_width};
use crate::record::{CertificateRecord, RenderConfig, Style};
use crate::escape::attribute;

pub const DEFAULT_COLOR_LEFT: &str = "#555";
pub const DEFAULT_COLOR_RIGHT: &str = "#4c1";
pub const DEFAULT_TEXT_COLOR: &str = "#fff";
pub const DEFAULT_FONT_SIZE: u32 = 11;

const HEIGHT: u32 = 20;
const FONT_FAMILY: &str = "Verdana,Geneva,DejaVu Sans,sans-serif";

/// Fully resolved badge appearance: every property has a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeStyle {
    pub color_left: String,
    pub color_right: String,
    pub text_color_left: String,
    pub text_color_right: String,
    pub font_size: u32,
    pub style: Style,
    pub logo: Option<String>,
}

impl BadgeStyle {
    /// Resolve each property from `config`, falling back to defaults.
    ///
    /// Side-specific text colors fall back to `text_color` before the
    /// default. A font size outside 8-16 is treated as unset.
    #[must_use]
    pub fn resolve(config: &RenderConfig) -> Self {
        let text_color = config.text_color.as_deref().unwrap_or(DEFAULT_TEXT_COLOR);
        Self {
            color_left: config
                .color_left
                .clone()
                .unwrap_or_else(|| DEFAULT_COLOR_LEFT.to_owned()),
            color_right: config
                .color_right
                .clone()
                .unwrap_or_else(|| DEFAULT_COLOR_RIGHT.to_owned()),
            text_color_left: config
                .text_color_left
                .clone()
                .unwrap_or_else(|| text_color.to_owned()),
            text_color_right: config
                .text_color_right
                .clone()
                .unwrap_or_else(|| text_color.to_owned()),
            font_size: config
                .font_size
                .filter(|size| crate::overrides::FONT_SIZE_RANGE.contains(size))
                .unwrap_or(DEFAULT_FONT_SIZE),
            style: config.style.unwrap_or_default(),
            logo: config.logo.clone(),
        }
    }
}

/// Geometry derived from the value text and font size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BadgeGeometry {
    width: u32,
    left: u32,
    right: u32,
    baseline: u32,
}

impl BadgeGeometry {
    fn new(value: &str, font_size: u32) -> Self {
        let width = compute_width("", value, font_size).max(LOGO_BLOCK_WIDTH);
        Self {
            width,
            left: LOGO_BLOCK_WIDTH,
            right: width - LOGO_BLOCK_WIDTH,
            // 10 + round(0.35 * font_size), in integer arithmetic
            baseline: 10 + (font_size * 35 + 50) / 100,
        }
    }

    fn text_center(self) -> f64 {
        f64::from(self.left) + f64::from(self.right) / 2.0
    }
}

/// Render the badge SVG for `record` using the effective `config`.
#[must_use]
pub fn render_badge(record: &CertificateRecord, config: &RenderConfig) -> Vec<u8> {
    let style = BadgeStyle::resolve(config);
    let value = record.display_value();
    let geometry = BadgeGeometry::new(value, style.font_size);
    render(value, &style, geometry).to_string().into_bytes()
}

fn render(value: &str, style: &BadgeStyle, g: BadgeGeometry) -> Document {
    let three_d = style.style == Style::ThreeD;

    let mut defs = Definitions::new()
        .add(
            LinearGradient::new()
                .set("id", "badge-gloss")
                .set("x2", 0)
                .set("y2", "100%")
                .add(
                    Stop::new()
                        .set("offset", 0)
                        .set("stop-color", "#bbb")
                        .set("stop-opacity", ".1"),
                )
                .add(Stop::new().set("offset", 1).set("stop-opacity", ".1")),
        )
        .add(
            ClipPath::new().set("id", "badge-round").add(
                Rectangle::new()
                    .set("width", g.width)
                    .set("height", HEIGHT)
                    .set("rx", 3)
                    .set("fill", "#fff"),
            ),
        );
    if three_d {
        defs = defs.add(
            Filter::new()
                .set("id", "badge-shadow")
                .set("x", "-10%")
                .set("y", "-10%")
                .set("width", "120%")
                .set("height", "140%")
                .add(
                    FilterEffectDropShadow::new()
                        .set("dx", 0)
                        .set("dy", 1)
                        .set("stdDeviation", 0.6)
                        .set("flood-color", "#000")
                        .set("flood-opacity", 0.35),
                ),
        );
    }

    let mut body = Group::new()
        .set("clip-path", "url(#badge-round)")
        .add(
            Rectangle::new()
                .set("width", g.left)
                .set("height", HEIGHT)
                .set("fill", attribute(&style.color_left)),
        )
        .add(
            Rectangle::new()
                .set("x", g.left)
                .set("width", g.right)
                .set("height", HEIGHT)
                .set("fill", attribute(&style.color_right)),
        )
        .add(
            Rectangle::new()
                .set("width", g.width)
                .set("height", HEIGHT)
                .set("fill", "url(#badge-gloss)"),
        );
    if three_d {
        body = body.add(
            Rectangle::new()
                .set("width", g.width)
                .set("height", HEIGHT)
                .set("fill", "none")
                .set("stroke", "#000")
                .set("stroke-opacity", ".25")
                .set("filter", "url(#badge-shadow)"),
        );
    }

    let x = format!("{:.1}", g.text_center());
    let mut text = Group::new()
        .set("fill", attribute(&style.text_color_right))
        .set("text-anchor", "middle")
        .set("font-family", FONT_FAMILY)
        .set("font-size", style.font_size);
    if three_d {
        text = text.add(
            SvgText::new(value)
                .set("x", x.as_str())
                .set("y", g.baseline + 1)
                .set("fill", "#010101")
                .set("fill-opacity", ".3"),
        );
    }
    text = text.add(SvgText::new(value).set("x", x).set("y", g.baseline));

    Document::new()
        .set("xmlns", "http://www.w3.org/2000/svg")
        .set("width", g.width)
        .set("height", HEIGHT)
        .set("viewBox", (0, 0, g.width, HEIGHT))
        .set("role", "img")
        .set("aria-label", attribute(value))
        .add(Title::new(value))
        .add(defs)
        .add(body)
        .add(logo(style, g))
        .add(text)
}

/// The left block: either the configured logo image or the built-in shield.
fn logo(style: &BadgeStyle, g: BadgeGeometry) -> Group {
    let dx = g.left / 2 - 8;
    if let Some(url) = &style.logo {
        return Group::new().add(
            Image::new()
                .set("x", dx)
                .set("y", 2)
                .set("width", 16)
                .set("height", 16)
                .set("href", attribute(url)),
        );
    }

    Group::new()
        .set("transform", format!("translate({dx} 0)"))
        .add(
            Path::new()
                .set("d", "M8 2.5 15 5v5c0 4-3 6.8-7 8-4-1.2-7-4-7-8V5z")
                .set("fill", attribute(&style.text_color_left)),
        )
        .add(
            Path::new()
                .set("d", "M8 2.5 15 5v5c0 4-3 6.8-7 8z")
                .set("fill", "#000")
                .set("fill-opacity", ".18"),
        )
        .add(
            Path::new()
                .set("d", "M4.6 10.2 7.2 12.8 11.6 7.6")
                .set("fill", "none")
                .set("stroke", attribute(&style.color_right))
                .set("stroke-width", 1.6)
                .set("stroke-linecap", "round")
                .set("stroke-linejoin", "round"),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record() -> CertificateRecord {
        CertificateRecord::new(
            "acme-core",
            "Open Compliance Board",
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            "acme-core",
            "1.4.0",
        )
    }

    fn render_str(record: &CertificateRecord, config: &RenderConfig) -> String {
        String::from_utf8(render_badge(record, config)).unwrap()
    }

    #[test]
    fn rendering_is_deterministic() {
        let config = RenderConfig {
            style: Some(Style::ThreeD),
            ..RenderConfig::default()
        };
        assert_eq!(render_badge(&record(), &config), render_badge(&record(), &config));
    }

    #[test]
    fn defaults_are_applied() {
        let svg = render_str(&record(), &RenderConfig::default());
        assert!(svg.contains("<svg "));
        assert!(svg.contains(r##"fill="#555""##));
        assert!(svg.contains(r##"fill="#4c1""##));
        assert!(svg.contains(r#"font-size="11""#));
        assert!(svg.contains(">1.4.0</text>"));
        // 46 + round(5 * 6.05) + round(12.1)
        assert!(svg.contains(r#"width="88""#));
    }

    #[test]
    fn shadow_filter_only_in_3d() {
        let flat = render_str(&record(), &RenderConfig::default());
        assert!(!flat.contains("<filter"));

        let three_d = render_str(
            &record(),
            &RenderConfig {
                style: Some(Style::ThreeD),
                ..RenderConfig::default()
            },
        );
        assert_eq!(three_d.matches("<filter").count(), 1);
        assert!(three_d.contains(r#"filter="url(#badge-shadow)""#));
    }

    #[test]
    fn certificate_name_replaces_version() {
        let mut record = record();
        record.certificate_name = Some("Verified <Deps>".to_owned());
        let svg = render_str(&record, &RenderConfig::default());
        assert!(svg.contains(">Verified &lt;Deps&gt;</text>"));
        assert!(!svg.contains("1.4.0"));
    }

    #[test]
    fn blank_certificate_name_renders_version() {
        let mut record = record();
        record.certificate_name = Some("   ".to_owned());
        let svg = render_str(&record, &RenderConfig::default());
        assert!(svg.contains(">1.4.0</text>"));
        assert!(svg.contains(r#"width="88""#));
    }

    #[test]
    fn text_colors_cascade() {
        let style = BadgeStyle::resolve(&RenderConfig {
            text_color: Some("#222".to_owned()),
            text_color_right: Some("#333".to_owned()),
            ..RenderConfig::default()
        });
        assert_eq!(style.text_color_left, "#222");
        assert_eq!(style.text_color_right, "#333");
    }

    #[test]
    fn out_of_range_stored_font_size_falls_back() {
        let style = BadgeStyle::resolve(&RenderConfig {
            font_size: Some(999),
            ..RenderConfig::default()
        });
        assert_eq!(style.font_size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn logo_url_replaces_builtin_shield() {
        let svg = render_str(
            &record(),
            &RenderConfig {
                logo: Some("https://example.com/logo.png?a=1&b=2".to_owned()),
                ..RenderConfig::default()
            },
        );
        assert!(svg.contains(r#"href="https://example.com/logo.png?a=1&amp;b=2""#));
        assert!(!svg.contains("<path"));
    }
}
