use crate::date::DEFAULT_DATE_FORMAT;
use crate::record::ColumnRoles;
use crate::sort::SortSpec;

/// 10 MiB of raw lines per read.
pub const DEFAULT_CHUNK_BYTES: usize = 10 * 1024 * 1024;

/// Run options with defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct RollupOptions {
    pub chunk_bytes: usize,           // byte budget per chunk, at least one line is always read
    pub date_format: String,          // `time` format description for the received-date column
    pub sort: Option<SortSpec>,       // None = first-seen order, (product, year) columns
    pub columns: ColumnRoles,         // header names of product / date received / company
    pub delimiter: u8,                // used for both input and report
    pub progress: bool,               // byte progress bar while reading

    // IO tuning
    pub read_buffer_bytes: usize,     // BufReader capacity
    pub write_buffer_bytes: usize,    // BufWriter capacity
}

impl Default for RollupOptions {
    fn default() -> Self {
        Self {
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            sort: Some(SortSpec::ProductYear),
            columns: ColumnRoles::default(),
            delimiter: b',',
            progress: false,

            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl RollupOptions {
    pub fn with_chunk_bytes(mut self, bytes: usize) -> Self {
        self.chunk_bytes = bytes.max(1);
        self
    }
    pub fn with_date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = pattern.into();
        self
    }
    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }
    pub fn with_columns(mut self, columns: ColumnRoles) -> Self {
        self.columns = columns;
        self
    }
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    // IO buffers tuning
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }
}
