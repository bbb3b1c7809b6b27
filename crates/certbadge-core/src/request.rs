//! Image request parameters.
//!
//! Parses the query string of an image request into the output format, the
//! outlook (badge or certificate), the `no_cache` flag and the visual
//! overrides. Bad `format` or `outlook` values are rejected; bad override
//! values are dropped by [`RenderOverrides::from_params`].

use std::str::FromStr;

use crate::error::ImageError;
use crate::overrides::RenderOverrides;
use crate::record::DerivedFormat;

/// Output encoding of an image response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    #[default]
    Svg,
    Png,
    Jpg,
}

impl ImageFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }

    /// MIME type for the `Content-Type` header.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml",
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
        }
    }

    /// The raster format to convert to, or `None` for SVG.
    #[must_use]
    pub fn derived(self) -> Option<DerivedFormat> {
        match self {
            Self::Svg => None,
            Self::Png => Some(DerivedFormat::Png),
            Self::Jpg => Some(DerivedFormat::Jpg),
        }
    }
}

impl FromStr for ImageFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "jpg" => Ok(Self::Jpg),
            _ => Err(ImageError::InvalidRequest {
                reason: format!("unsupported format '{s}', expected svg, png or jpg"),
            }),
        }
    }
}

/// Which renderer produces the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Outlook {
    #[default]
    Badge,
    Certificate,
}

impl FromStr for Outlook {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "badge" => Ok(Self::Badge),
            "certificate" => Ok(Self::Certificate),
            _ => Err(ImageError::InvalidRequest {
                reason: format!("unsupported outlook '{s}', expected badge or certificate"),
            }),
        }
    }
}

/// A parsed image request, minus the identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRequest {
    pub format: ImageFormat,
    pub outlook: Outlook,
    /// Skip the response cache for both lookup and store.
    pub no_cache: bool,
    pub overrides: RenderOverrides,
    /// The raw query string; part of the response-cache key.
    pub raw_query: String,
}

impl ImageRequest {
    /// Parse query parameters.
    ///
    /// `format` defaults to svg and `outlook` to badge; an empty value counts
    /// as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidRequest`] for an unrecognized format or
    /// outlook.
    pub fn from_params<'a, I>(params: I, raw_query: Option<&str>) -> Result<Self, ImageError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)> + Clone,
    {
        let mut request = Self {
            raw_query: raw_query.unwrap_or_default().to_owned(),
            overrides: RenderOverrides::from_params(params.clone()),
            ..Self::default()
        };

        for (key, value) in params {
            let value = value.trim();
            match key {
                "format" if !value.is_empty() => request.format = value.parse()?,
                "outlook" if !value.is_empty() => request.outlook = value.parse()?,
                "no_cache" => {
                    request.no_cache = value == "1"
                        || value.eq_ignore_ascii_case("true")
                        || value.eq_ignore_ascii_case("yes");
                }
                _ => {}
            }
        }
        Ok(request)
    }

    /// Whether the request asks for the default rendering of its format:
    /// the badge outlook with no accepted overrides. Only such renders are
    /// persisted as a record's derived images.
    #[must_use]
    pub fn is_default_rendering(&self) -> bool {
        self.outlook == Outlook::Badge && self.overrides.is_empty()
    }
}
