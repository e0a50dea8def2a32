//! Numeric field normalization for the tabular exports.
//!
//! Blank cells read as zero. Anything else must parse or the caller
//! rejects the row. Only the reading tracker spells unknown values as
//! `N/A`; [`is_not_applicable`] lets its row builder map that to zero.

use crate::utils::round2;

const NOT_APPLICABLE: &str = "N/A";

/// The reading tracker's token for an unknown value, in any case.
pub fn is_not_applicable(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case(NOT_APPLICABLE)
}

/// Parses a rating cell.
pub fn parse_rating(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0.0);
    }
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parses a vote/rating count: thousands separators are stripped and a
/// fractional value is truncated.
pub fn parse_count(raw: &str) -> Option<u64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return Some(0);
    }
    let value = cleaned.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.trunc() as u64)
}

/// Rating-site ratings are already on the 10-point scale.
pub fn ten_point(rating: f64) -> f64 {
    round2(rating)
}

/// Rescales a 5-point rating to the 10-point scale.
pub fn five_to_ten_point(rating: f64) -> f64 {
    round2(rating * 2.0)
}
