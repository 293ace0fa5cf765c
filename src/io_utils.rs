//! Table I/O boundary: reading rosters into a [`Sheet`] and writing the
//! cleaned sheet back out.
//!
//! - **Delimited text**: extension-based delimiter detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override, input decoding via `encoding_rs`
//!   (UTF-8 default), stdin/stdout through the `-` path convention.
//! - **Workbooks**: `.xlsx`/`.xls` files read through `calamine`, first sheet
//!   by default or a named sheet via `--sheet`.
//! - **Output**: always-quoted CSV for round-trip safety, UTF-8.
//!
//! The engine never touches storage details; it only sees a `Sheet`.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use calamine::{Reader, Xls, Xlsx, open_workbook};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::sheet::Sheet;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_workbook(path: &Path) -> bool {
    matches!(extension_of(path).as_deref(), Some("xlsx") | Some("xls"))
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match extension_of(path).as_deref() {
        Some("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    match path.and_then(|p| extension_of(p)).as_deref() {
        Some("tsv") => DEFAULT_TSV_DELIMITER,
        Some("csv") => DEFAULT_CSV_DELIMITER,
        _ => fallback,
    }
}

/// Read an input roster into a [`Sheet`], routing on the file extension.
pub fn read_sheet(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    sheet_name: Option<&str>,
) -> Result<Sheet> {
    if is_workbook(path) {
        read_workbook_sheet(path, sheet_name)
    } else {
        if sheet_name.is_some() {
            return Err(anyhow!(
                "--sheet only applies to workbook inputs (.xlsx/.xls)"
            ));
        }
        read_delimited_sheet(path, delimiter, encoding)
    }
}

fn read_delimited_sheet(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Sheet> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader);

    let headers = decode_record(&csv_reader.byte_headers()?.clone(), encoding)
        .with_context(|| format!("Decoding header row of {path:?}"))?;

    let mut rows = Vec::new();
    for (ordinal, result) in csv_reader.into_byte_records().enumerate() {
        let record = result.with_context(|| format!("Reading row {}", ordinal + 2))?;
        rows.push(
            decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {}", ordinal + 2))?,
        );
    }
    Ok(Sheet::new(headers, rows))
}

fn read_workbook_sheet(path: &Path, sheet_name: Option<&str>) -> Result<Sheet> {
    if is_dash(path) {
        return Err(anyhow!("Workbook input requires a regular file, not stdin"));
    }
    match extension_of(path).as_deref() {
        Some("xlsx") => {
            let workbook: Xlsx<_> = open_workbook(path)
                .with_context(|| format!("Opening workbook {path:?}"))?;
            workbook_to_sheet(workbook, path, sheet_name)
        }
        Some("xls") => {
            let workbook: Xls<_> = open_workbook(path)
                .with_context(|| format!("Opening workbook {path:?}"))?;
            workbook_to_sheet(workbook, path, sheet_name)
        }
        other => Err(anyhow!("Unsupported workbook extension {other:?}")),
    }
}

fn workbook_to_sheet<R>(mut workbook: R, path: &Path, sheet_name: Option<&str>) -> Result<Sheet>
where
    R: Reader<BufReader<File>>,
    R::Error: std::error::Error + Send + Sync + 'static,
{
    let names = workbook.sheet_names().to_vec();
    let selected = match sheet_name {
        Some(name) => names
            .iter()
            .find(|candidate| candidate.as_str() == name)
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "Sheet '{name}' not found in {path:?}; available sheets: {}",
                    names.join(", ")
                )
            })?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("Workbook {path:?} contains no sheets"))?,
    };
    let range = workbook
        .worksheet_range(&selected)
        .with_context(|| format!("Reading sheet '{selected}' from {path:?}"))?;

    let mut cell_rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
    let headers = cell_rows
        .next()
        .ok_or_else(|| anyhow!("Sheet '{selected}' in {path:?} has no header row"))?;
    let rows = cell_rows.collect();
    Ok(Sheet::new(headers, rows))
}

/// Serialize a [`Sheet`] as delimited text to a file, or stdout when `path`
/// is `None` or `-`.
pub fn write_sheet(path: Option<&Path>, delimiter: u8, sheet: &Sheet) -> Result<()> {
    let target: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(target);

    writer
        .write_record(sheet.headers.iter())
        .context("Writing output headers")?;
    for (ordinal, row) in sheet.rows.iter().enumerate() {
        writer
            .write_record(row.iter())
            .with_context(|| format!("Writing output row {}", ordinal + 1))?;
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}

fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}
