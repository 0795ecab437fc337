//! Field parsers. Nothing here coerces: a value that does not parse is
//! reported with its record number and field name.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::error::NormalizeError;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

fn malformed(record: usize, field: &'static str, raw: &str) -> NormalizeError {
    NormalizeError::MalformedField {
        record,
        field,
        value: raw.to_string(),
    }
}

pub(crate) fn required<'a>(
    record: usize,
    field: &'static str,
    raw: &'a str,
) -> Result<&'a str, NormalizeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        Err(NormalizeError::MissingField { record, field })
    } else {
        Ok(raw)
    }
}

/// Decimal with `,` or `.` as the separator and optional space grouping.
pub(crate) fn decimal(record: usize, field: &'static str, raw: &str) -> Result<Decimal, NormalizeError> {
    let raw = required(record, field, raw)?;
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    let normalized = if compact.contains('.') {
        compact.replace(',', "")
    } else {
        compact.replace(',', ".")
    };

    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .map_err(|_| malformed(record, field, raw))
}

/// Decimal that is allowed to be blank (treated as zero).
pub(crate) fn optional_decimal(
    record: usize,
    field: &'static str,
    raw: &str,
) -> Result<Decimal, NormalizeError> {
    if raw.trim().is_empty() {
        Ok(Decimal::ZERO)
    } else {
        decimal(record, field, raw)
    }
}

/// Whole number of contracts.
pub(crate) fn integral(record: usize, field: &'static str, raw: &str) -> Result<Decimal, NormalizeError> {
    let value = decimal(record, field, raw)?;
    if value.fract().is_zero() {
        Ok(value.trunc())
    } else {
        Err(malformed(record, field, raw))
    }
}

pub(crate) fn timestamp(
    record: usize,
    field: &'static str,
    raw: &str,
) -> Result<NaiveDateTime, NormalizeError> {
    let raw = required(record, field, raw)?;

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| malformed(record, field, raw))
}
