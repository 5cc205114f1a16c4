#![allow(dead_code)]

use complaint_rollup::{run, MemorySink, RollupOptions, RunStats};
use std::fs;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "Date received,Product,Sub-product,Issue,Company,State,Complaint ID";

/// Scratch directory that lives for the whole test.
pub fn scratch() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

/// One data line in the `HEADER` layout.
pub fn row(date: &str, product: &str, company: &str) -> String {
    format!("{},{},,Late fee,{},NY,1", date, csv_field(product), csv_field(company))
}

/// Quote a field the way a CSV export would when it has to.
pub fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Write `HEADER` plus `rows` (newline-terminated) into `dir/name`.
pub fn write_input(dir: &Path, name: &str, rows: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut body = String::from(HEADER);
    body.push('\n');
    for r in rows {
        body.push_str(r);
        body.push('\n');
    }
    fs::write(&path, body).unwrap();
    path
}

/// Run end to end with an in-memory sink; returns (report text, stats, diagnostics).
pub fn rollup(opts: RollupOptions, input: &Path, output: &Path) -> (String, RunStats, MemorySink) {
    let mut sink = MemorySink::new();
    let stats = run(opts, input, output, &mut sink).unwrap();
    let report = fs::read_to_string(output).unwrap();
    (report, stats, sink)
}

/// Report lines split into fields (no quoting in the fixtures that use this).
pub fn report_rows(report: &str) -> Vec<Vec<String>> {
    report
        .lines()
        .map(|l| l.split(',').map(String::from).collect())
        .collect()
}
