//! Per-request visual overrides.
//!
//! Query parameters such as `color_left` or `font_size` replace the stored
//! [`RenderConfig`] field of the same name for one render. Values that are
//! empty, malformed or out of range are dropped here, silently: a request
//! with `font_size=999` renders exactly like one without it.

use std::ops::RangeInclusive;

use crate::record::{RenderConfig, Style};

/// Accepted badge font sizes, inclusive.
pub const FONT_SIZE_RANGE: RangeInclusive<u32> = 8..=16;

/// Longest accepted CSS color keyword.
const MAX_COLOR_NAME_LEN: usize = 20;

/// Longest accepted logo URL.
const MAX_LOGO_URL_LEN: usize = 2048;

/// Whether `value` is a hex color (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`)
/// or a plain CSS color keyword.
#[must_use]
pub fn is_valid_color(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.bytes().all(|b| b.is_ascii_hexdigit());
    }
    !value.is_empty()
        && value.len() <= MAX_COLOR_NAME_LEN
        && value.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Whether `value` may be embedded as a logo image reference.
#[must_use]
pub fn is_valid_logo_url(value: &str) -> bool {
    value.len() <= MAX_LOGO_URL_LEN
        && (value.starts_with("https://")
            || value.starts_with("http://")
            || value.starts_with("data:image/"))
        && !value.chars().any(char::is_whitespace)
}

/// The accepted subset of a request's override parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOverrides {
    pub color_left: Option<String>,
    pub color_right: Option<String>,
    pub text_color: Option<String>,
    pub text_color_left: Option<String>,
    pub text_color_right: Option<String>,
    pub logo: Option<String>,
    pub font_size: Option<u32>,
    pub style: Option<Style>,
}

impl RenderOverrides {
    /// Collect overrides from query parameters. Unrecognized keys and invalid
    /// values are ignored; for repeated keys the last valid value wins.
    pub fn from_params<'a, I>(params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut overrides = Self::default();
        for (key, value) in params {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let color = || is_valid_color(value).then(|| value.to_owned());
            match key {
                "color_left" => overrides.color_left = color().or(overrides.color_left),
                "color_right" => overrides.color_right = color().or(overrides.color_right),
                "text_color" => overrides.text_color = color().or(overrides.text_color),
                "text_color_left" => {
                    overrides.text_color_left = color().or(overrides.text_color_left);
                }
                "text_color_right" => {
                    overrides.text_color_right = color().or(overrides.text_color_right);
                }
                "logo" => {
                    if is_valid_logo_url(value) {
                        overrides.logo = Some(value.to_owned());
                    }
                }
                "font_size" => {
                    if let Ok(size) = value.parse::<u32>() {
                        if FONT_SIZE_RANGE.contains(&size) {
                            overrides.font_size = Some(size);
                        }
                    }
                }
                "style" => {
                    if let Ok(style) = value.parse::<Style>() {
                        overrides.style = Some(style);
                    }
                }
                _ => {}
            }
        }
        overrides
    }

    /// Whether no override survived validation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl RenderConfig {
    /// The effective configuration: `self` with every present override
    /// applied on top.
    #[must_use]
    pub fn merged(&self, overrides: &RenderOverrides) -> Self {
        fn pick<T: Clone>(over: Option<&T>, base: Option<&T>) -> Option<T> {
            over.or(base).cloned()
        }

        Self {
            color_left: pick(overrides.color_left.as_ref(), self.color_left.as_ref()),
            color_right: pick(overrides.color_right.as_ref(), self.color_right.as_ref()),
            text_color: pick(overrides.text_color.as_ref(), self.text_color.as_ref()),
            text_color_left: pick(
                overrides.text_color_left.as_ref(),
                self.text_color_left.as_ref(),
            ),
            text_color_right: pick(
                overrides.text_color_right.as_ref(),
                self.text_color_right.as_ref(),
            ),
            logo: pick(overrides.logo.as_ref(), self.logo.as_ref()),
            font_size: overrides.font_size.or(self.font_size),
            style: overrides.style.or(self.style),
            ..self.clone()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(pairs: &[(&str, &str)]) -> RenderOverrides {
        RenderOverrides::from_params(pairs.iter().copied())
    }

    #[test]
    fn color_syntax() {
        assert!(is_valid_color("#fff"));
        assert!(is_valid_color("#4c1a"));
        assert!(is_valid_color("#0a0b0c"));
        assert!(is_valid_color("#0a0b0cff"));
        assert!(is_valid_color("teal"));
        assert!(!is_valid_color("#12345"));
        assert!(!is_valid_color("#ggg"));
        assert!(!is_valid_color("red\" onload=\"x"));
        assert!(!is_valid_color(""));
    }

    #[test]
    fn logo_urls() {
        assert!(is_valid_logo_url("https://example.com/logo.svg"));
        assert!(is_valid_logo_url("data:image/png;base64,AAAA"));
        assert!(!is_valid_logo_url("javascript:alert(1)"));
        assert!(!is_valid_logo_url("https://example.com/a b.svg"));
    }

    #[test]
    fn accepts_valid_values() {
        let overrides = parse(&[
            ("color_left", "#333"),
            ("color_right", "navy"),
            ("font_size", "14"),
            ("style", "3d"),
            ("logo", "https://example.com/l.png"),
        ]);
        assert_eq!(overrides.color_left.as_deref(), Some("#333"));
        assert_eq!(overrides.color_right.as_deref(), Some("navy"));
        assert_eq!(overrides.font_size, Some(14));
        assert_eq!(overrides.style, Some(Style::ThreeD));
        assert!(overrides.logo.is_some());
    }

    #[test]
    fn drops_out_of_range_and_unknown_values() {
        let overrides = parse(&[
            ("font_size", "999"),
            ("font_size", "7"),
            ("style", "plastic"),
            ("color_left", "not a color"),
            ("text_color", ""),
            ("format", "png"),
        ]);
        assert!(overrides.is_empty());
    }

    #[test]
    fn font_size_bounds_are_inclusive() {
        assert_eq!(parse(&[("font_size", "8")]).font_size, Some(8));
        assert_eq!(parse(&[("font_size", "16")]).font_size, Some(16));
        assert_eq!(parse(&[("font_size", "17")]).font_size, None);
    }

    #[test]
    fn later_invalid_value_keeps_earlier_valid_one() {
        let overrides = parse(&[("color_left", "#111"), ("color_left", "bad value")]);
        assert_eq!(overrides.color_left.as_deref(), Some("#111"));
    }

    #[test]
    fn merge_replaces_only_present_fields() {
        let stored = RenderConfig {
            color_left: Some("#000".to_owned()),
            color_right: Some("#111".to_owned()),
            font_size: Some(10),
            bar_color: Some("#222".to_owned()),
            ..RenderConfig::default()
        };
        let merged = stored.merged(&parse(&[("color_right", "#abc"), ("font_size", "12")]));

        assert_eq!(merged.color_left.as_deref(), Some("#000"));
        assert_eq!(merged.color_right.as_deref(), Some("#abc"));
        assert_eq!(merged.font_size, Some(12));
        assert_eq!(merged.bar_color.as_deref(), Some("#222"));
    }

    fn color_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            "#[0-9a-f]{6}".prop_map(String::from),
            "[a-z]{3,10}".prop_map(String::from),
            ".{0,8}".prop_map(String::from),
        ]
    }

    proptest! {
        #[test]
        fn applying_overrides_twice_equals_once(
            left in color_strategy(),
            right in color_strategy(),
            size in 0_u32..32,
            style in prop_oneof![Just("flat"), Just("3d"), Just("bogus")],
            stored_size in proptest::option::of(8_u32..=16),
        ) {
            let size = size.to_string();
            let overrides = parse(&[
                ("color_left", left.as_str()),
                ("color_right", right.as_str()),
                ("font_size", size.as_str()),
                ("style", style),
            ]);
            let stored = RenderConfig { font_size: stored_size, ..RenderConfig::default() };

            let once = stored.merged(&overrides);
            let twice = once.merged(&overrides);
            prop_assert_eq!(once, twice);
        }
    }
}
