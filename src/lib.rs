pub mod cli;
pub mod columns;
pub mod dates;
pub mod dedup;
pub mod io_utils;
pub mod sheet;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("roster_dedup", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Dedup(args) => dedup::execute(&args),
        Commands::Columns(args) => handle_columns(&args),
        Commands::Preview(args) => handle_preview(&args),
    }
}

fn handle_columns(args: &cli::ColumnsArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let sheet = io_utils::read_sheet(&args.input, delimiter, encoding, args.sheet.as_deref())
        .with_context(|| format!("Reading {:?}", args.input))?;

    let identity = columns::resolve(&sheet.headers, columns::IDENTITY_CANDIDATES);
    let date = columns::resolve(&sheet.headers, columns::DATE_CANDIDATES);

    let mut rows = Vec::with_capacity(sheet.headers.len());
    for (idx, header) in sheet.headers.iter().enumerate() {
        let role = if identity == Some(idx) {
            "identity"
        } else if date == Some(idx) {
            "date"
        } else {
            ""
        };
        rows.push(vec![(idx + 1).to_string(), header.clone(), role.to_string()]);
    }
    let headers = vec!["#".to_string(), "name".to_string(), "role".to_string()];
    table::print_table(&headers, &rows);

    if identity.is_none() {
        warn!("No column matched the identity candidate names");
    }
    if date.is_none() {
        warn!("No column matched the date candidate names");
    }
    info!(
        "Listed {} column(s) from {:?}",
        sheet.column_count(),
        args.input
    );
    Ok(())
}

fn handle_preview(args: &cli::PreviewArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let sheet = io_utils::read_sheet(&args.input, delimiter, encoding, args.sheet.as_deref())
        .with_context(|| format!("Reading {:?}", args.input))?;

    let shown: Vec<Vec<String>> = sheet.rows.iter().take(args.rows).cloned().collect();
    table::print_table(&sheet.headers, &shown);
    info!(
        "Displayed {} of {} row(s) from {:?}",
        shown.len(),
        sheet.row_count(),
        args.input
    );
    Ok(())
}
