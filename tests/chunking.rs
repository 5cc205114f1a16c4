#[path = "common/mod.rs"]
mod common;

use common::*;
use complaint_rollup::{ChunkedReader, ComplaintAggregator, RollupOptions};
use std::fs;
use std::io::Cursor;

fn sample_rows() -> Vec<String> {
    (0..300)
        .map(|i| {
            let date = if i % 37 == 0 { "not a date".to_string() } else { format!("{}-0{}-15", 2015 + i % 4, 1 + i % 9) };
            let product = ["Mortgage", "Credit card", "Loans, student", "Debt \"collection\""][i % 4];
            let company = ["Acme", "ACME", "Zeta Bank", "Omega, Inc."][i % 3];
            if i % 53 == 0 {
                format!("{},{}", date, product)
            } else {
                row(&date, product, company)
            }
        })
        .collect()
}

/// Report and diagnostics are the same for every chunk budget, including budgets smaller
/// than a single line.
#[test]
fn results_do_not_depend_on_chunk_size() {
    let dir = scratch();
    let input = write_input(dir.path(), "complaints.csv", &sample_rows());

    let reference_out = dir.path().join("reference.csv");
    let (reference, ref_stats, ref_sink) = rollup(RollupOptions::default(), &input, &reference_out);
    assert!(ref_stats.rejected() > 0);
    assert_eq!(ref_stats.chunks, 1);

    for bytes in [1usize, 10, 64, 333, 4096] {
        let out = dir.path().join(format!("report_{}.csv", bytes));
        let (report, stats, sink) = rollup(RollupOptions::default().with_chunk_bytes(bytes), &input, &out);
        assert_eq!(report, reference, "chunk bytes {}", bytes);
        assert_eq!(sink.entries, ref_sink.entries, "chunk bytes {}", bytes);
        assert_eq!(stats.accepted, ref_stats.accepted);
        assert!(stats.chunks >= ref_stats.chunks);
    }
}

/// One chunk per line when the budget is below a line's length.
#[test]
fn tiny_budget_reads_one_line_per_chunk() {
    let rows = sample_rows();
    let mut src = format!("{}\n", HEADER);
    for r in &rows {
        src.push_str(r);
        src.push('\n');
    }
    let reader = ChunkedReader::new(Cursor::new(src.into_bytes()), 1).unwrap();
    let chunks: Vec<_> = reader.map(|c| c.unwrap()).collect();
    assert_eq!(chunks.len(), rows.len());
    assert!(chunks.iter().all(|c| c.lines == 1));
}

/// A quoted field holding a line break parses correctly when both halves land in one chunk.
/// When a chunk boundary falls inside it, the halves are reported as malformed rows
/// instead of being silently merged into a wrong record.
#[test]
fn quoted_newline_across_chunk_boundary() {
    let src = format!(
        "{}\n2019-01-01,Mortgage,\"first\nsecond\",Late fee,Acme,NY,1\n2019-01-02,Mortgage,,Late fee,Acme,NY,2\n",
        HEADER
    );

    let mut sink = complaint_rollup::MemorySink::new();
    let mut agg = ComplaintAggregator::new(RollupOptions::default());
    agg.read_from(Cursor::new(src.clone().into_bytes()), &mut sink).unwrap();
    assert_eq!(agg.stats().accepted, 2);
    assert!(sink.entries.is_empty());

    let mut sink = complaint_rollup::MemorySink::new();
    let mut agg = ComplaintAggregator::new(RollupOptions::default().with_chunk_bytes(1));
    agg.read_from(Cursor::new(src.into_bytes()), &mut sink).unwrap();
    assert_eq!(agg.stats().accepted, 1);
    assert_eq!(agg.stats().rejected(), 2);
    assert!(sink.codes().iter().all(|c| !c.is_fatal()));
}

/// Windows line endings are handled the same as Unix ones.
#[test]
fn crlf_input() {
    let dir = scratch();
    let input = dir.path().join("complaints.csv");
    let body = format!("{}\r\n{}\r\n{}\r\n", HEADER, row("2019-01-01", "Mortgage", "A"), row("2019-01-01", "Mortgage", "B"));
    fs::write(&input, body).unwrap();
    let output = dir.path().join("report.csv");
    for bytes in [1usize, 1 << 20] {
        let (report, _, sink) = rollup(RollupOptions::default().with_chunk_bytes(bytes), &input, &output);
        assert_eq!(report, "mortgage,2019,2,2,50\n");
        assert!(sink.entries.is_empty());
    }
}
