//! Price text normalization and discount math.
//!
//! Romanian retailers print prices like "123,45 Lei" or "123.45 RON";
//! the comma is the decimal separator.

/// Parses raw price text into a numeric value.
///
/// Strips everything except digits, comma, and period, then treats the
/// first comma as the decimal separator. Returns `None` when no digits
/// survive or the cleaned string does not parse as a finite number.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String =
        text.chars().filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.').collect();

    if cleaned.is_empty() {
        return None;
    }

    let normalized = cleaned.replacen(',', ".", 1);

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Computes the discount percentage between a current and an original price.
///
/// Returns `Some` only when both prices are present, the current price is
/// positive, and the original price is strictly greater. Rounded to two
/// decimals.
pub fn discount_percentage(current: Option<f64>, original: Option<f64>) -> Option<f64> {
    let (current, original) = (current?, original?);

    if current <= 0.0 || original <= current {
        return None;
    }

    let discount = (original - current) / original * 100.0;
    Some((discount * 100.0).round() / 100.0)
}
