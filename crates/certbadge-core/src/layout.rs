//! Badge width calculation.
//!
//! Approximates proportional-font advance widths from character counts
//! alone, with no font metrics. The multipliers and padding below are fixed:
//! badge geometry and text anchors derive from the returned width.

/// Width returned when there is nothing to show.
pub const MIN_WIDTH: u32 = 80;

/// Width of the logo block used when the label is too short to render.
pub const LOGO_BLOCK_WIDTH: u32 = 46;

/// Labels this long or shorter are replaced by the logo block.
pub const LOGO_LABEL_THRESHOLD: usize = 2;

const LOGO_CHAR_FACTOR: f64 = 0.55;
const LABEL_CHAR_FACTOR: f64 = 0.75;

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn round_px(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

#[allow(clippy::cast_precision_loss)]
fn chars(n: usize) -> f64 {
    n as f64
}

/// Total badge width in pixels for `label` and `value` at `font_size`.
///
/// - Both empty: [`MIN_WIDTH`].
/// - Label of at most two characters: [`LOGO_BLOCK_WIDTH`] plus the value
///   at `0.55 * font_size` per character and two characters of padding.
/// - Otherwise `0.75 * font_size` per character, with four characters of
///   padding when both texts are present and two when only one is.
///
/// Width grows monotonically with the value length once the value is
/// non-empty. The empty/empty case is a floor, not part of that series: a
/// one-character value next to an empty label is narrower than [`MIN_WIDTH`].
#[must_use]
pub fn compute_width(label: &str, value: &str, font_size: u32) -> u32 {
    let label_len = label.chars().count();
    let value_len = value.chars().count();
    let font_size = f64::from(font_size);

    if label_len == 0 && value_len == 0 {
        return MIN_WIDTH;
    }

    if label_len <= LOGO_LABEL_THRESHOLD {
        let char_width = font_size * LOGO_CHAR_FACTOR;
        return LOGO_BLOCK_WIDTH
            + round_px(chars(value_len) * char_width)
            + round_px(2.0 * char_width);
    }

    let char_width = font_size * LABEL_CHAR_FACTOR;
    if value_len > 0 {
        round_px(chars(label_len + value_len) * char_width) + round_px(4.0 * char_width)
    } else {
        round_px(chars(label_len) * char_width) + round_px(2.0 * char_width)
    }
}
