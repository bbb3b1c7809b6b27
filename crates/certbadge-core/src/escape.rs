//! Escaping for the places the `svg` crate does not cover.
//!
//! Element trees built with the `svg` crate escape their text nodes, but
//! attribute values are written verbatim, and the certificate template is
//! filled by plain text substitution.

use std::borrow::Cow;

/// Escape text for use in XML character data and attribute values.
///
/// XML escaping only: `&`, `<`, `>`, `"` and `'`. HTML named entities such
/// as `&nbsp;` are not valid in SVG and are never produced.
pub(crate) fn escape_xml(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// A user-supplied attribute value, escaped for `Element::set`.
pub(crate) fn attribute(value: &str) -> String {
    escape_xml(value).into_owned()
}
