//! Type-specific value normalizers.
//!
//! Captured values pass through one of these before being stored in a
//! record: text is trimmed, numbers are parsed from European or plain
//! formats, dates are parsed into `NaiveDate`.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::profile::ValueType;
use crate::models::record::FieldValue;

lazy_static! {
    // Amount embedded in a larger capture, e.g. "1 234,56 zł". Dotted and
    // comma thousands groupings come first so "1.234,56" matches whole
    // instead of stopping at the first separator.
    static ref EMBEDDED_AMOUNT: Regex = Regex::new(
        r"\d{1,3}(?:\.\d{3})+,\d+|\d{1,3}(?:,\d{3})+\.\d+|\d{1,3}(?:[\s\u{00a0}]\d{3})*[,.]\d+|\d+[,.]\d+|\d+"
    ).unwrap();

    static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();

    static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})\b"
    ).unwrap();

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Normalize a captured value into its declared type.
///
/// Returns `None` when the capture cannot be read as that type; the
/// engine treats this the same as a non-match.
pub fn normalize(raw: &str, value_type: ValueType) -> Option<FieldValue> {
    match value_type {
        ValueType::Text => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(FieldValue::Text(trimmed.to_string()))
            }
        }
        ValueType::Number => parse_decimal(raw).map(FieldValue::Number),
        ValueType::Date => parse_iso_or_european_date(raw).map(FieldValue::Date),
    }
}

/// Parse a locale-aware decimal amount.
///
/// Accepts European formats (`1 234,56`, NBSP thousands separators) and
/// plain ones (`1234.56`). The amount may be embedded in a larger capture.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let matched = EMBEDDED_AMOUNT.find(s)?.as_str();

    let cleaned: String = matched
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else if cleaned.contains(',') && cleaned.contains('.') {
        // Whichever separator comes last is the decimal point.
        match (cleaned.rfind(','), cleaned.rfind('.')) {
            (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
            _ => cleaned.replace(',', ""),
        }
    } else {
        cleaned
    };

    Decimal::from_str(&normalized).ok()
}

/// Parse a decimal only when the whole input is one amount.
///
/// Unlike [`parse_decimal`] this rejects values that merely contain
/// digits (dates, invoice numbers), so comparison code does not mistake
/// `2025-01-15` for the number 2025.
pub fn parse_decimal_exact(s: &str) -> Option<Decimal> {
    let trimmed = s.trim();
    let m = EMBEDDED_AMOUNT.find(trimmed)?;
    if m.start() != 0 || m.end() != trimmed.len() {
        return None;
    }
    parse_decimal(trimmed)
}

/// Parse a date in ISO (`2025-01-15`) or European (`15.01.2025`) form.
///
/// Two-digit years pivot at 50: 00-50 land in the 2000s, 51-99 in the
/// 1900s.
pub fn parse_iso_or_european_date(s: &str) -> Option<NaiveDate> {
    if let Some(caps) = DATE_YMD.captures(s) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = DATE_DMY.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = parse_year(&caps[3]);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    None
}

/// Case-fold and collapse whitespace for text comparison.
pub fn fold_text(s: &str) -> String {
    WHITESPACE
        .replace_all(s.trim(), " ")
        .to_lowercase()
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 {
        if year <= 50 {
            2000 + year
        } else {
            1900 + year
        }
    } else {
        year
    }
}
