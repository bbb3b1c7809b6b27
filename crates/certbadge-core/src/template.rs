//! Certificate template documents.
//!
//! A template is an SVG document with `{{slot}}` placeholders. Parsing
//! resolves every placeholder to a [`Slot`] up front, so rendering is a
//! straight walk over literal text and typed slots with no lookups that can
//! miss. The renderer decides the value and escaping of each slot.
//!
//! Templates come from a [`TemplateSource`]: the embedded default, or a file
//! read on every render. A file that reads fine but does not parse falls
//! back to the embedded template.

use std::borrow::Cow;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use tracing::warn;

use crate::error::{RenderError, TemplateError};

/// The template compiled into the binary.
pub const EMBEDDED_TEMPLATE: &str = include_str!("../assets/certificate.svg");

static EMBEDDED: LazyLock<Result<CertificateTemplate, TemplateError>> =
    LazyLock::new(|| CertificateTemplate::parse(EMBEDDED_TEMPLATE));

/// A named value the certificate renderer supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Width,
    Height,
    Title,
    BackgroundColor,
    BarColor,
    BorderColor,
    GradientStart,
    GradientEnd,
    TopLabelColor,
    TopLabel,
    CertNameColor,
    NameLine1,
    NameLine2,
    NameLine3,
    /// A complete `<text>` element, or nothing when the record has no
    /// specialty domain.
    SpecialtyLine,
    LogoColor,
    Slogan,
}

impl FromStr for Slot {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "width" => Self::Width,
            "height" => Self::Height,
            "title" => Self::Title,
            "background_color" => Self::BackgroundColor,
            "bar_color" => Self::BarColor,
            "border_color" => Self::BorderColor,
            "gradient_start" => Self::GradientStart,
            "gradient_end" => Self::GradientEnd,
            "top_label_color" => Self::TopLabelColor,
            "top_label" => Self::TopLabel,
            "cert_name_color" => Self::CertNameColor,
            "name_line_1" => Self::NameLine1,
            "name_line_2" => Self::NameLine2,
            "name_line_3" => Self::NameLine3,
            "specialty_line" => Self::SpecialtyLine,
            "logo_color" => Self::LogoColor,
            "slogan" => Self::Slogan,
            other => {
                return Err(TemplateError::UnknownSlot {
                    name: other.to_owned(),
                });
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

/// A parsed certificate template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateTemplate {
    segments: Vec<Segment>,
}

impl CertificateTemplate {
    /// Parse template text.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotSvg`] if there is no `<svg` root,
    /// [`TemplateError::Unterminated`] for a `{{` without `}}`, and
    /// [`TemplateError::UnknownSlot`] for an unrecognized placeholder.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        if !source.trim_start().starts_with("<svg") {
            return Err(TemplateError::NotSvg);
        }

        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;
        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_owned()));
            }
            let after_open = &rest[open + 2..];
            let close = after_open
                .find("}}")
                .ok_or(TemplateError::Unterminated {
                    offset: offset + open,
                })?;
            segments.push(Segment::Slot(after_open[..close].trim().parse()?));

            let consumed = open + 2 + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_owned()));
        }

        Ok(Self { segments })
    }

    /// The embedded default template.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Template`] if the embedded asset is broken,
    /// which only a bad build can cause.
    pub fn embedded() -> Result<&'static Self, RenderError> {
        EMBEDDED.as_ref().map_err(|e| RenderError::Template(e.clone()))
    }

    /// Slots referenced by this template, in document order.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(slot) => Some(*slot),
            Segment::Literal(_) => None,
        })
    }

    /// Produce the document, asking `value` for each slot in turn.
    pub fn render<'a>(&self, mut value: impl FnMut(Slot) -> Cow<'a, str>) -> String {
        let mut out = String::with_capacity(4096);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(&value(*slot)),
            }
        }
        out
    }
}

/// Where the certificate template comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateSource {
    #[default]
    Embedded,
    /// Read from disk on every render.
    File(PathBuf),
}

impl TemplateSource {
    /// Load the template for one render.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::TemplateRead`] if the file cannot be read. A
    /// file that cannot be parsed is not an error: the embedded template is
    /// used instead.
    pub fn load(&self) -> Result<Cow<'static, CertificateTemplate>, RenderError> {
        match self {
            Self::Embedded => Ok(Cow::Borrowed(CertificateTemplate::embedded()?)),
            Self::File(path) => {
                let text =
                    std::fs::read_to_string(path).map_err(|e| RenderError::TemplateRead {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                match CertificateTemplate::parse(&text) {
                    Ok(template) => Ok(Cow::Owned(template)),
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "certificate template invalid, using embedded template"
                        );
                        Ok(Cow::Borrowed(CertificateTemplate::embedded()?))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn embedded_template_parses_and_covers_every_slot() {
        let template = CertificateTemplate::embedded().unwrap();
        let slots: Vec<_> = template.slots().collect();
        for slot in [
            Slot::Width,
            Slot::Height,
            Slot::Title,
            Slot::BackgroundColor,
            Slot::BarColor,
            Slot::BorderColor,
            Slot::GradientStart,
            Slot::GradientEnd,
            Slot::TopLabelColor,
            Slot::TopLabel,
            Slot::CertNameColor,
            Slot::NameLine1,
            Slot::NameLine2,
            Slot::NameLine3,
            Slot::SpecialtyLine,
            Slot::LogoColor,
            Slot::Slogan,
        ] {
            assert!(slots.contains(&slot), "embedded template lacks {slot:?}");
        }
    }

    #[test]
    fn parse_and_render() {
        let template = CertificateTemplate::parse("<svg a=\"{{ width }}\">{{slogan}}</svg>").unwrap();
        let out = template.render(|slot| match slot {
            Slot::Width => Cow::Borrowed("170"),
            Slot::Slogan => Cow::Borrowed("ok"),
            _ => Cow::Borrowed(""),
        });
        assert_eq!(out, "<svg a=\"170\">ok</svg>");
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            CertificateTemplate::parse("<html></html>"),
            Err(TemplateError::NotSvg)
        ));
        assert!(matches!(
            CertificateTemplate::parse("<svg>{{width</svg>"),
            Err(TemplateError::Unterminated { offset: 5 })
        ));
        assert!(matches!(
            CertificateTemplate::parse("<svg>{{colour}}</svg>"),
            Err(TemplateError::UnknownSlot { .. })
        ));
    }

    #[test]
    fn unparseable_file_falls_back_to_embedded() {
        let path = std::env::temp_dir().join(format!(
            "certbadge-template-{}-broken.svg",
            std::process::id()
        ));
        std::fs::write(&path, "<svg>{{nope}}</svg>").unwrap();

        let loaded = TemplateSource::File(path.clone()).load().unwrap();
        assert_eq!(&*loaded, CertificateTemplate::embedded().unwrap());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn valid_file_is_used() {
        let path = std::env::temp_dir().join(format!(
            "certbadge-template-{}-custom.svg",
            std::process::id()
        ));
        std::fs::write(&path, "<svg>{{top_label}}</svg>").unwrap();

        let loaded = TemplateSource::File(path.clone()).load().unwrap();
        assert_eq!(loaded.slots().collect::<Vec<_>>(), vec![Slot::TopLabel]);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = TemplateSource::File(PathBuf::from("/nonexistent/certbadge.svg"))
            .load()
            .unwrap_err();
        assert!(matches!(err, RenderError::TemplateRead { .. }));
    }
}
