use anyhow::{Context, Result};
use clap::Parser;
use complaint_rollup::{
    default_log_path, init_tracing_once, open_sink, parse_sort_option, run, ColumnRoles, MissingColumns,
    RollupOptions, SinkKind, SortSpec, DEFAULT_CHUNK_BYTES, DEFAULT_DATE_FORMAT,
};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "complaint-rollup",
    about = "Roll up consumer complaints by product and year: total complaints, distinct companies, \
             and the share of the most complained-about company",
    version,
    long_about = None
)]
struct Args {
    /// Path to the complaints CSV (first line is the header)
    input: PathBuf,

    /// Path where the report CSV is written
    output: PathBuf,

    /// Read the input in chunks of this many bytes
    #[arg(long, visible_alias = "buff-size", default_value_t = DEFAULT_CHUNK_BYTES, value_parser = parse_chunk_bytes)]
    chunk_bytes: usize,

    /// Pattern for the received-date column, in `time` format-description syntax
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    date_format: String,

    /// Row order and column order: 0|product, 1|year, 01|product,year, 10|year,product, none
    #[arg(long, default_value = "01", value_parser = parse_sort_option)]
    sort: std::option::Option<SortSpec>,

    /// Where per-record warnings go: skip, console or file
    #[arg(long, default_value = "skip")]
    log: SinkKind,

    /// Diagnostics file for `--log file` (default: parse_errors.log next to the input)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write run counters as JSON to this path
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Header name of the product column
    #[arg(long, default_value = "Product")]
    product_column: String,

    /// Header name of the received-date column
    #[arg(long, default_value = "Date received")]
    date_column: String,

    /// Header name of the company column
    #[arg(long, default_value = "Company")]
    company_column: String,

    /// Field delimiter for input and output
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Show a progress bar while reading
    #[arg(long)]
    progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_chunk_bytes(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("chunk size must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid chunk size {:?}: {}", s, e)),
    }
}

fn write_stats(path: &std::path::Path, stats: &complaint_rollup::RunStats) -> Result<()> {
    let f = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, stats)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

/// Final message for a fatal header. The console sink has already printed `1: E0001`.
fn missing_columns_message(missing: &MissingColumns, log: SinkKind) -> String {
    if log == SinkKind::Console {
        format!("Aborted: {}", missing)
    } else {
        format!("1: {} ({})", missing.code(), missing)
    }
}

fn execute(args: &Args) -> Result<()> {
    if !args.delimiter.is_ascii() {
        anyhow::bail!("--delimiter must be a single ASCII character");
    }

    let opts = RollupOptions::default()
        .with_chunk_bytes(args.chunk_bytes)
        .with_date_format(args.date_format.clone())
        .with_sort(args.sort)
        .with_columns(ColumnRoles::new(&args.product_column, &args.date_column, &args.company_column))
        .with_delimiter(args.delimiter as u8)
        .with_progress(args.progress);

    let log_path = args.log_file.clone().unwrap_or_else(|| default_log_path(&args.input));
    let mut sink = open_sink(args.log, &log_path)?;

    let stats = run(opts, &args.input, &args.output, &mut *sink)?;

    if let Some(path) = &args.stats {
        write_stats(path, &stats)?;
        tracing::info!("Run counters written to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing_once(if args.verbose { "debug" } else { "info" });

    match execute(&args) {
        Ok(()) => {
            println!("Done!");
            Ok(())
        }
        Err(e) => {
            if let Some(missing) = e.downcast_ref::<MissingColumns>() {
                tracing::error!("{}", missing_columns_message(missing, args.log));
            } else {
                tracing::error!("Error: {:#}", e);
            }
            std::process::exit(1);
        }
    }
}
