//! The rollup driver: stream chunks through the parser into the tally, then write the report.
//!
//! Per-record failures are reported to the caller's `DiagnosticSink` and skipped. The only
//! fatal data condition is a header missing one of the role columns: `E0001` is reported at
//! line 1 and `MissingColumns` comes back as the error, before any output is created.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::chunked::ChunkedReader;
use crate::config::RollupOptions;
use crate::date::DateFormat;
use crate::diagnostics::{DiagnosticCode, DiagnosticSink};
use crate::progress::ProgressScope;
use crate::record::{RecordError, RecordParser};
use crate::report::write_report;
use crate::tally::TallyStore;
use crate::util::{create_with_backoff, replace_file_atomic};

/// Counters for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub records: u64,
    pub accepted: u64,
    pub rejected_field_count: u64,
    pub rejected_date: u64,
    pub rejected_other: u64,
    pub groups: usize,
    pub chunks: u64,
    pub bytes: u64,
    pub rows_written: usize,
}

impl RunStats {
    pub fn rejected(&self) -> u64 {
        self.rejected_field_count + self.rejected_date + self.rejected_other
    }

    fn reject(&mut self, err: RecordError) {
        match err {
            RecordError::FieldCount { .. } => self.rejected_field_count += 1,
            RecordError::Date => self.rejected_date += 1,
            RecordError::Other => self.rejected_other += 1,
        }
    }
}

/// Owns the tally for one invocation: `read` populates it, `save` consumes it.
pub struct ComplaintAggregator {
    opts: RollupOptions,
    store: TallyStore,
    stats: RunStats,
}

impl ComplaintAggregator {
    pub fn new(opts: RollupOptions) -> Self {
        Self { opts, store: TallyStore::new(), stats: RunStats::default() }
    }

    pub fn options(&self) -> &RollupOptions {
        &self.opts
    }

    pub fn store(&self) -> &TallyStore {
        &self.store
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Stream `input` into the tally.
    pub fn read(&mut self, input: &Path, sink: &mut dyn DiagnosticSink) -> Result<&RunStats> {
        let reader = ChunkedReader::open(input, self.opts.chunk_bytes, self.opts.read_buffer_bytes)?;
        let progress = if self.opts.progress {
            let total = std::fs::metadata(input).map(|m| m.len()).unwrap_or(0);
            Some(ProgressScope::bytes("Reading complaints", total))
        } else {
            None
        };
        tracing::info!("Reading {} in chunks of {} bytes", input.display(), self.opts.chunk_bytes);

        let res = self.ingest(reader, sink, progress.as_ref());
        if let Some(pb) = &progress {
            pb.finish(if res.is_ok() { "Reading complaints: done" } else { "Reading complaints: failed" });
        }
        res
    }

    /// Stream any buffered source into the tally. The first line must be the header.
    pub fn read_from<R: BufRead>(&mut self, src: R, sink: &mut dyn DiagnosticSink) -> Result<&RunStats> {
        let reader = ChunkedReader::new(src, self.opts.chunk_bytes).context("read header")?;
        self.ingest(reader, sink, None)
    }

    fn ingest<R: BufRead>(
        &mut self,
        mut reader: ChunkedReader<R>,
        sink: &mut dyn DiagnosticSink,
        progress: Option<&ProgressScope>,
    ) -> Result<&RunStats> {
        let date_format = DateFormat::new(&self.opts.date_format)?;
        let parser = match RecordParser::new(reader.header(), &self.opts.columns, date_format, self.opts.delimiter) {
            Ok(p) => p,
            Err(missing) => {
                sink.report(1, DiagnosticCode::MissingColumns)?;
                sink.flush()?;
                return Err(missing.into());
            }
        };
        tracing::debug!("Resolved header columns: {:?}", parser.layout());

        // Header is line 1; data records are numbered from 2 in read order.
        let mut line: u64 = 1;
        while let Some(chunk) = reader.next_chunk().context("read chunk")? {
            for parsed in parser.parse_chunk(&chunk.bytes) {
                line += 1;
                self.stats.records += 1;
                match parsed {
                    Ok((key, company)) => {
                        self.store.update(key, company);
                        self.stats.accepted += 1;
                    }
                    Err(err) => {
                        self.stats.reject(err);
                        sink.report(line, err.code())?;
                    }
                }
            }
            if let Some(pb) = progress {
                pb.set_bytes(reader.bytes_read());
            }
        }
        sink.flush()?;

        self.stats.groups = self.store.len();
        self.stats.chunks += reader.chunks_read();
        self.stats.bytes += reader.bytes_read();
        tracing::info!(
            "Read {} records ({} accepted, {} rejected) into {} groups",
            self.stats.records,
            self.stats.accepted,
            self.stats.rejected(),
            self.stats.groups
        );
        Ok(&self.stats)
    }

    /// Write the report to any writer. Returns the number of rows.
    pub fn write_to<W: Write>(&mut self, out: W) -> Result<usize> {
        let rows = write_report(&self.store, self.opts.sort, self.opts.delimiter, out)?;
        self.stats.rows_written = rows;
        Ok(rows)
    }

    /// Write the report to `output`. The rows go to a sibling temp file first, so a failed
    /// write never leaves a partial report behind; the temp file is removed on failure.
    pub fn save(&mut self, output: &Path) -> Result<usize> {
        let tmp = temp_path_for(output);
        let f = create_with_backoff(&tmp, 16, 50).with_context(|| format!("create {}", tmp.display()))?;
        let res = self.save_via(f, &tmp, output);
        if res.is_err() && tmp.exists() {
            if let Err(e) = std::fs::remove_file(&tmp) {
                tracing::warn!("Could not remove {}: {}", tmp.display(), e);
            }
        }
        let rows = res?;
        tracing::info!("Wrote {} rows to {}", rows, output.display());
        Ok(rows)
    }

    fn save_via(&mut self, f: std::fs::File, tmp: &Path, output: &Path) -> Result<usize> {
        let mut w = BufWriter::with_capacity(self.opts.write_buffer_bytes, f);
        let rows = self.write_to(&mut w).with_context(|| format!("write {}", tmp.display()))?;
        w.flush().with_context(|| format!("flush {}", tmp.display()))?;
        drop(w);
        replace_file_atomic(tmp, output)?;
        Ok(rows)
    }

    /// Drop the aggregator, keeping the populated tally.
    pub fn into_store(self) -> TallyStore {
        self.store
    }
}

fn temp_path_for(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    output.with_file_name(name)
}

/// One full run: read `input`, write `output`, return the counters.
pub fn run(opts: RollupOptions, input: &Path, output: &Path, sink: &mut dyn DiagnosticSink) -> Result<RunStats> {
    let mut agg = ComplaintAggregator::new(opts);
    agg.read(input, sink)?;
    agg.save(output)?;
    Ok(agg.stats)
}
