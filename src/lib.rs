mod config;
mod date;
mod diagnostics;

mod chunked;
mod record;
mod tally;
mod sort;
mod report;

mod progress;
mod util;
mod aggregator;

pub use crate::config::{RollupOptions, DEFAULT_CHUNK_BYTES};
pub use crate::date::{DateError, DateFormat, DEFAULT_DATE_FORMAT};

// Per-record diagnostics: codes, the sink trait and its stock variants.
pub use crate::diagnostics::{
    open_sink, ConsoleSink, DiagnosticCode, DiagnosticSink, DiscardSink, FileSink, MemorySink, SinkKind,
};

// Streaming core: reader -> parser -> tally -> report.
pub use crate::chunked::{Chunk, ChunkedReader};
pub use crate::record::{normalize, ColumnRoles, HeaderLayout, MissingColumns, RawRecord, RecordError, RecordParser};
pub use crate::tally::{CompanyTally, GroupKey, TallyStore};
pub use crate::sort::{parse_sort_option, SortSpec};
pub use crate::report::{build_rows, percentage, write_report, ReportRow};

// Driver and run summary.
pub use crate::aggregator::{run, ComplaintAggregator, RunStats};

// Progress and file helpers for the binary.
pub use crate::progress::ProgressScope;
pub use crate::util::{create_with_backoff, default_log_path, init_tracing_once, open_with_backoff, replace_file_atomic};
