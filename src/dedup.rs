//! Duplicate resolution engine.
//!
//! Resolves the identity and date columns, orders rows so the record to keep
//! comes first within each identity group, then performs a keep-first scan.
//! With a date column the most recent entry wins; without one the first
//! occurrence in the file wins. The ordering policy is chosen once after
//! column resolution and applied uniformly, so the degraded no-date mode is
//! a variant of the policy rather than a special case in the scan.

use std::{cmp::Ordering, collections::HashSet, fs::File, io::BufWriter};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use itertools::Itertools;
use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::{cli::DedupArgs, columns, dates, io_utils, sheet::Sheet};

#[derive(Debug, Error)]
pub enum DedupError {
    #[error(
        "no identity column matched the candidate names; available columns: {}",
        .available.join(", ")
    )]
    MissingIdentityColumn { available: Vec<String> },
}

/// Before/after statistics for one resolution run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DedupReport {
    pub original_rows: usize,
    pub final_rows: usize,
    pub removed_rows: usize,
    pub removed_percentage: f64,
    /// Distinct identity values that appeared more than once in the input.
    pub duplicate_identities: usize,
    pub identity_column: String,
    pub date_column: Option<String>,
}

enum OrderingPolicy {
    /// Sort by identity ascending, then timestamp descending with
    /// unparseable dates last, then source ordinal.
    DateAware { date_index: usize },
    /// Keep source order; the first row per identity wins.
    InsertionOrder,
}

/// Resolve duplicates in `sheet`, keeping one row per distinct identity.
///
/// Fails only when no column matches the identity candidate set; the missing
/// date column and unparseable date cells are recoverable conditions.
pub fn resolve_duplicates(sheet: Sheet) -> Result<(Sheet, DedupReport), DedupError> {
    let identity_index = columns::resolve(&sheet.headers, columns::IDENTITY_CANDIDATES)
        .ok_or_else(|| DedupError::MissingIdentityColumn {
            available: sheet.headers.clone(),
        })?;
    let identity_column = sheet.headers[identity_index].clone();

    let date_index = columns::resolve(&sheet.headers, columns::DATE_CANDIDATES);
    let date_column = date_index.map(|idx| sheet.headers[idx].clone());
    let policy = match date_index {
        Some(date_index) => OrderingPolicy::DateAware { date_index },
        None => {
            warn!("No date column matched; keeping the first occurrence of each identity");
            OrderingPolicy::InsertionOrder
        }
    };

    let original_rows = sheet.row_count();
    let duplicate_identities = sheet
        .column_values(identity_index)
        .into_iter()
        .counts()
        .values()
        .filter(|&&count| count > 1)
        .count();

    let order = match policy {
        OrderingPolicy::DateAware { date_index } => {
            let timestamps = dates::normalize_column(sheet.column_values(date_index));
            let unparsed = timestamps.iter().filter(|t| t.is_none()).count();
            if unparsed > 0 {
                debug!(
                    "{unparsed} of {} date value(s) could not be parsed and will sort last",
                    timestamps.len()
                );
            }
            recency_order(&sheet, identity_index, &timestamps)
        }
        OrderingPolicy::InsertionOrder => (0..original_rows).collect(),
    };

    let kept: Vec<usize> = {
        let mut seen: HashSet<&str> = HashSet::with_capacity(original_rows);
        let mut kept = Vec::with_capacity(original_rows);
        for &row in &order {
            if seen.insert(sheet.cell(row, identity_index)) {
                kept.push(row);
            }
        }
        kept
    };

    let final_rows = kept.len();
    let removed_rows = original_rows - final_rows;
    let removed_percentage = if original_rows == 0 {
        0.0
    } else {
        removed_rows as f64 / original_rows as f64 * 100.0
    };

    let headers = sheet.headers.clone();
    let mut rows = sheet.rows;
    let clean_rows = kept
        .into_iter()
        .map(|row| std::mem::take(&mut rows[row]))
        .collect();

    let report = DedupReport {
        original_rows,
        final_rows,
        removed_rows,
        removed_percentage,
        duplicate_identities,
        identity_column,
        date_column,
    };
    Ok((Sheet::new(headers, clean_rows), report))
}

/// Row order for date-aware resolution: identity ascending, then timestamp
/// descending with `None` last, then source ordinal. The ordinal tie-break
/// makes the earlier source row win among equal identity+date pairs.
fn recency_order(
    sheet: &Sheet,
    identity_index: usize,
    timestamps: &[Option<NaiveDateTime>],
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..sheet.row_count()).collect();
    order.sort_by(|&a, &b| {
        sheet
            .cell(a, identity_index)
            .cmp(sheet.cell(b, identity_index))
            .then_with(|| compare_recency(timestamps[a], timestamps[b]))
            .then_with(|| a.cmp(&b))
    });
    order
}

fn compare_recency(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Run the `dedup` subcommand: read, resolve, report, write.
pub fn execute(args: &DedupArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let input_encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let output_path = args.output.as_deref();
    info!(
        "Deduplicating '{}' -> {}",
        args.input.display(),
        output_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into())
    );

    let sheet = io_utils::read_sheet(&args.input, delimiter, input_encoding, args.sheet.as_deref())
        .with_context(|| format!("Reading {:?}", args.input))?;
    info!(
        "Read {} row(s) across {} column(s)",
        sheet.row_count(),
        sheet.column_count()
    );

    let (clean, report) = resolve_duplicates(sheet)?;

    info!("Identity column: '{}'", report.identity_column);
    match &report.date_column {
        Some(column) => info!("Date column: '{column}' (most recent entry wins)"),
        None => info!("Date column: none (first occurrence wins)"),
    }
    info!(
        "Rows: {} -> {} ({} removed, {:.1}%); {} identit(ies) had duplicates",
        report.original_rows,
        report.final_rows,
        report.removed_rows,
        report.removed_percentage,
        report.duplicate_identities
    );

    let output_delimiter =
        io_utils::resolve_output_delimiter(output_path, args.output_delimiter, delimiter);
    io_utils::write_sheet(output_path, output_delimiter, &clean)?;

    if let Some(path) = &args.stats_json {
        let file = File::create(path).with_context(|| format!("Creating stats file {path:?}"))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)
            .with_context(|| format!("Writing statistics to {path:?}"))?;
        info!("Statistics written to {path:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(headers: &[&str], rows: &[&[&str]]) -> Sheet {
        Sheet::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn keeps_most_recent_row_per_identity() {
        let input = sheet(
            &["EMPLOYEE", "DOCUMENT", "ENTRY_DATE"],
            &[
                &["Juan P", "123456", "2023-01-15"],
                &["María G", "789012", "2023-02-20"],
                &["Juan P", "123456", "2023-03-10"],
                &["Carlos L", "345678", "2023-01-05"],
            ],
        );
        let (clean, report) = resolve_duplicates(input).unwrap();

        assert_eq!(report.original_rows, 4);
        assert_eq!(report.final_rows, 3);
        assert_eq!(report.removed_rows, 1);
        assert_eq!(report.removed_percentage, 25.0);
        assert_eq!(report.duplicate_identities, 1);
        assert_eq!(report.identity_column, "DOCUMENT");
        assert_eq!(report.date_column.as_deref(), Some("ENTRY_DATE"));

        let kept = clean
            .rows
            .iter()
            .find(|row| row[1] == "123456")
            .expect("document 123456 retained");
        assert_eq!(kept[2], "2023-03-10");
        assert_eq!(clean.row_count(), 3);
    }

    #[test]
    fn missing_identity_column_reports_available_headers() {
        let input = sheet(&["NOMBRE", "CARGO"], &[&["Juan P", "Ventas"]]);
        let err = resolve_duplicates(input).unwrap_err();
        let DedupError::MissingIdentityColumn { available } = err;
        assert_eq!(available, vec!["NOMBRE".to_string(), "CARGO".to_string()]);
    }

    #[test]
    fn missing_date_column_keeps_first_occurrence_in_source_order() {
        let input = sheet(
            &["DOCUMENTO", "CARGO"],
            &[
                &["111", "Ventas"],
                &["222", "RRHH"],
                &["111", "IT"],
                &["333", "Legal"],
            ],
        );
        let (clean, report) = resolve_duplicates(input).unwrap();
        assert_eq!(report.date_column, None);
        let cargos: Vec<&str> = clean.rows.iter().map(|row| row[1].as_str()).collect();
        assert_eq!(cargos, vec!["Ventas", "RRHH", "Legal"]);
    }

    #[test]
    fn unparseable_date_loses_to_valid_date_regardless_of_order() {
        let input = sheet(
            &["DOCUMENTO", "FECHA"],
            &[
                &["111", "pending"],
                &["111", "2023-01-15"],
            ],
        );
        let (clean, _) = resolve_duplicates(input).unwrap();
        assert_eq!(clean.row_count(), 1);
        assert_eq!(clean.rows[0][1], "2023-01-15");
    }

    #[test]
    fn equal_identity_and_date_keeps_earlier_source_row() {
        let input = sheet(
            &["DOCUMENTO", "FECHA", "CARGO"],
            &[
                &["111", "2023-01-15", "first"],
                &["111", "2023-01-15", "second"],
            ],
        );
        let (clean, _) = resolve_duplicates(input).unwrap();
        assert_eq!(clean.row_count(), 1);
        assert_eq!(clean.rows[0][2], "first");
    }

    #[test]
    fn empty_input_produces_empty_output_without_error() {
        let input = sheet(&["DOCUMENTO", "FECHA"], &[]);
        let (clean, report) = resolve_duplicates(input).unwrap();
        assert_eq!(clean.row_count(), 0);
        assert_eq!(report.original_rows, 0);
        assert_eq!(report.removed_rows, 0);
        assert_eq!(report.removed_percentage, 0.0);
    }

    #[test]
    fn rerunning_on_clean_output_removes_nothing() {
        let input = sheet(
            &["DOCUMENTO", "FECHA"],
            &[
                &["222", "2023-02-20"],
                &["111", "2023-01-15"],
                &["111", "2023-03-10"],
            ],
        );
        let (clean, _) = resolve_duplicates(input).unwrap();
        let first_pass: Vec<Vec<String>> = clean.rows.clone();
        let (again, report) = resolve_duplicates(clean).unwrap();
        assert_eq!(report.removed_rows, 0);
        assert_eq!(again.rows, first_pass);
    }

    #[test]
    fn identity_values_are_compared_exactly() {
        // " 111" and "111" are distinct identities; only the column name is
        // normalized, never the value.
        let input = sheet(
            &["DOCUMENTO"],
            &[&[" 111"], &["111"]],
        );
        let (clean, report) = resolve_duplicates(input).unwrap();
        assert_eq!(clean.row_count(), 2);
        assert_eq!(report.removed_rows, 0);
    }
}
