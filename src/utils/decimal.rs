use std::str::FromStr;
use std::sync::OnceLock;

use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use regex::Regex;

pub trait BigDecimalHelpers {
    fn to_f64_or_zero(&self) -> f64;
}

impl BigDecimalHelpers for BigDecimal {
    fn to_f64_or_zero(&self) -> f64 {
        self.to_f64().unwrap_or(0.0)
    }
}

impl BigDecimalHelpers for Option<BigDecimal> {
    fn to_f64_or_zero(&self) -> f64 {
        self.as_ref()
            .map(|bd| bd.to_f64().unwrap_or(0.0))
            .unwrap_or(0.0)
    }
}

/// Round half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d[\d.,]*").expect("number pattern is valid"))
}

fn digits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("digits pattern is valid"))
}

/// Parse a scraped money/rating string such as `"R$ 1.234,56"` or `"4,92 (31)"`.
///
/// The scraped source writes `.` as the thousands separator and `,` as the
/// decimal mark. Currency symbols and anything after the first number are
/// ignored. Returns `None` when no number can be recovered.
pub fn clean_decimal(raw: &str) -> Option<BigDecimal> {
    let matched = number_pattern().find(raw.trim())?;
    let normalized = matched
        .as_str()
        .replace('.', "")
        .replace(',', ".");
    let normalized = normalized.trim_end_matches('.');
    if normalized.is_empty() {
        return None;
    }
    BigDecimal::from_str(normalized).ok()
}

/// Parse an integer, falling back to the first run of digits (`"2 hóspedes"` -> 2).
pub fn clean_integer(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        if value.is_finite() && value >= i32::MIN as f64 && value <= i32::MAX as f64 {
            return Some(value.trunc() as i32);
        }
    }
    digits_pattern()
        .find(trimmed)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}
