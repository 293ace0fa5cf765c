//! Date normalization for the resolved date column.
//!
//! Every raw cell is parsed into a naive timestamp used only for relative
//! ordering; no timezone handling. Values that fail every format become
//! `None` rather than an error, and the engine orders those last within
//! their identity group.

use chrono::{Duration, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// Parse a raw cell into a timestamp, or `None` when nothing applies.
///
/// Date-only values promote to midnight. Purely numeric values are treated
/// as Excel date serials, which is how workbook date cells usually surface
/// once stringified.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    trimmed.parse::<f64>().ok().and_then(from_excel_serial)
}

// Days since 1899-12-30, fraction of a day as seconds. The range guard
// rejects numbers that cannot plausibly be a date serial.
fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !(1.0..200_000.0).contains(&serial) {
        return None;
    }
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    base.checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// Normalize a whole column of raw values into optional timestamps.
pub fn normalize_column<'a, I>(values: I) -> Vec<Option<NaiveDateTime>>
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().map(parse_timestamp).collect()
}
