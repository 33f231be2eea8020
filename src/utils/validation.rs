//! Validation utilities for raw field values

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::NaiveDate;
use std::str::FromStr;

use crate::types::*;

const CURRENCY_SYMBOLS: [char; 4] = ['₹', '$', '€', '£'];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Longest numeric cell accepted, sign and decimal point included
const MAX_NUMERIC_LEN: usize = 32;

/// Strip currency symbols, thousands separators and whitespace from a numeric field
fn clean_numeric(raw: &str) -> String {
    raw.trim()
        .trim_start_matches(|c: char| CURRENCY_SYMBOLS.contains(&c))
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect()
}

/// Parse a cleaned numeric cell as plain, bounded decimal notation.
/// Exponent forms such as `1e-2000000` are refused.
fn parse_plain_decimal(cleaned: &str) -> Option<BigDecimal> {
    let digits = cleaned.strip_prefix(['-', '+']).unwrap_or(cleaned);
    let plain = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|c| *c == '.').count() <= 1;
    if !plain || cleaned.len() > MAX_NUMERIC_LEN {
        return None;
    }
    BigDecimal::from_str(cleaned).ok()
}

/// Parse an amount field. Blank or absent values are `MissingAmount`.
pub fn parse_amount(raw: Option<&str>) -> Result<BigDecimal, InvalidRecordError> {
    let raw = match raw {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(InvalidRecordError::MissingAmount),
    };

    parse_plain_decimal(&clean_numeric(raw)).ok_or_else(|| InvalidRecordError::InvalidAmount {
        value: raw.trim().to_string(),
    })
}

/// Parse a quantity field, defaulting to one when blank
pub fn parse_quantity(raw: Option<&str>) -> Result<BigDecimal, InvalidRecordError> {
    match raw {
        Some(value) if !value.trim().is_empty() => parse_plain_decimal(&clean_numeric(value))
            .ok_or_else(|| InvalidRecordError::InvalidQuantity {
                value: value.trim().to_string(),
            }),
        _ => Ok(BigDecimal::from(1)),
    }
}

/// Line total from quantity and unit price, rounded to two decimals
pub fn line_total(quantity: &BigDecimal, unit_price: &BigDecimal) -> BigDecimal {
    (quantity * unit_price).with_scale_round(2, RoundingMode::HalfUp)
}

/// Parse an optional date field. Blank values are `None`; unrecognised ones are an error.
pub fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, InvalidRecordError> {
    let raw = match raw {
        Some(value) if !value.trim().is_empty() => value.trim(),
        _ => return Ok(None),
    };

    // Spreadsheet exports often append a midnight time component
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .map(Some)
        .ok_or_else(|| InvalidRecordError::InvalidDate {
            value: raw.to_string(),
        })
}

/// A record needs at least one non-blank identifying field
pub fn validate_identity(fields: &[&str]) -> Result<(), InvalidRecordError> {
    if fields.iter().all(|f| f.trim().is_empty()) {
        Err(InvalidRecordError::MissingIdentity)
    } else {
        Ok(())
    }
}

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> Result<(), InvalidRecordError> {
    if *amount <= BigDecimal::from(0) {
        Err(InvalidRecordError::NonPositiveAmount {
            value: amount.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validate a free-text field length
pub fn validate_field_length(field: &str, value: &str, max: usize) -> Result<(), InvalidRecordError> {
    if value.chars().count() > max {
        Err(InvalidRecordError::FieldTooLong {
            field: field.to_string(),
            max,
        })
    } else {
        Ok(())
    }
}

/// Whether two amounts agree within `epsilon` (strictly less than).
/// Equal amounts always agree, even with a zero epsilon.
pub fn amounts_agree(a: &BigDecimal, b: &BigDecimal, epsilon: &BigDecimal) -> bool {
    let difference = (a - b).abs();
    difference == BigDecimal::from(0) || difference < *epsilon
}

/// Compare two references the way reconcilers read them: trimmed, case-insensitive
pub fn references_equal(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/// Lowercased words of `text` with punctuation trimmed from their edges
fn citation_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Whether `reference` cites `invoice_no` as a run of whole words,
/// e.g. "Invoice #1004 bank transfer" cites "1004" and "paid INV 1004" cites "INV 1004"
pub fn reference_cites(reference: &str, invoice_no: &str) -> bool {
    let wanted = citation_tokens(invoice_no);
    if wanted.is_empty() {
        return false;
    }
    citation_tokens(reference)
        .windows(wanted.len())
        .any(|window| window == wanted.as_slice())
}
