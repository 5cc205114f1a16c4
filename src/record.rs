//! Record parsing: resolve the three role columns in the header, split each data line with a
//! standard CSV grammar, and turn the extracted fields into a normalized `(GroupKey, company)`.

use csv::{ReaderBuilder, StringRecord};
use std::fmt;

use crate::date::{DateError, DateFormat};
use crate::diagnostics::DiagnosticCode;
use crate::tally::GroupKey;

/// Header names of the three columns the rollup needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRoles {
    pub product: String,
    pub date_received: String,
    pub company: String,
}

impl Default for ColumnRoles {
    fn default() -> Self {
        Self {
            product: "Product".to_string(),
            date_received: "Date received".to_string(),
            company: "Company".to_string(),
        }
    }
}

impl ColumnRoles {
    pub fn new(product: impl Into<String>, date_received: impl Into<String>, company: impl Into<String>) -> Self {
        Self { product: product.into(), date_received: date_received.into(), company: company.into() }
    }
}

/// Fatal: the header lacks one or more role columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingColumns {
    pub missing: Vec<String>,
}

impl MissingColumns {
    pub fn code(&self) -> DiagnosticCode {
        DiagnosticCode::MissingColumns
    }
}

impl fmt::Display for MissingColumns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "required columns not found in header: {}", self.missing.join(", "))
    }
}

impl std::error::Error for MissingColumns {}

/// Why a single data line was skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordError {
    FieldCount { expected: usize, found: usize },
    Date,
    Other,
}

impl RecordError {
    pub fn code(self) -> DiagnosticCode {
        match self {
            RecordError::FieldCount { .. } => DiagnosticCode::FieldCount,
            RecordError::Date => DiagnosticCode::DateFormat,
            RecordError::Other => DiagnosticCode::Unexpected,
        }
    }
}

/// The three raw fields of one row. Borrowed from the row; lives for one parse step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub product: &'a str,
    pub date_received: &'a str,
    pub company: &'a str,
}

impl<'a> RawRecord<'a> {
    /// Lower-case product and company, reduce the date to its year.
    pub fn normalize(&self, date_format: &DateFormat) -> Result<(GroupKey, String), RecordError> {
        let year = date_format.year_of(self.date_received).map_err(|e| match e {
            DateError::Mismatch => RecordError::Date,
            DateError::NoYear => RecordError::Other,
        })?;
        Ok((GroupKey::new(normalize(self.product), year), normalize(self.company)))
    }
}

/// Case-folding applied to product and company names. Surrounding whitespace is kept.
#[inline]
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
}

/// Zero-based positions of the role columns, plus the header width every row must match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderLayout {
    pub width: usize,
    pub product: usize,
    pub date_received: usize,
    pub company: usize,
}

impl HeaderLayout {
    /// First matching header cell wins for each role; names are compared exactly.
    pub fn resolve(header: &StringRecord, roles: &ColumnRoles) -> Result<Self, MissingColumns> {
        let find = |name: &str| header.iter().position(|h| h == name);
        let (product, date_received, company) =
            (find(roles.product.as_str()), find(roles.date_received.as_str()), find(roles.company.as_str()));

        match (product, date_received, company) {
            (Some(product), Some(date_received), Some(company)) => Ok(Self {
                width: header.len(),
                product,
                date_received,
                company,
            }),
            _ => {
                let missing = [
                    (product, &roles.product),
                    (date_received, &roles.date_received),
                    (company, &roles.company),
                ]
                .into_iter()
                .filter(|(idx, _)| idx.is_none())
                .map(|(_, name)| name.clone())
                .collect();
                Err(MissingColumns { missing })
            }
        }
    }

    pub fn extract<'r>(&self, row: &'r StringRecord) -> Result<RawRecord<'r>, RecordError> {
        if row.len() != self.width {
            return Err(RecordError::FieldCount { expected: self.width, found: row.len() });
        }
        let field = |i: usize| row.get(i).ok_or(RecordError::Other);
        Ok(RawRecord {
            product: field(self.product)?,
            date_received: field(self.date_received)?,
            company: field(self.company)?,
        })
    }
}

/// Parser bound to one header: turns chunks of raw lines into normalized records.
#[derive(Clone, Debug)]
pub struct RecordParser {
    layout: HeaderLayout,
    date_format: DateFormat,
    delimiter: u8,
}

impl RecordParser {
    pub fn new(
        header: &[u8],
        roles: &ColumnRoles,
        date_format: DateFormat,
        delimiter: u8,
    ) -> Result<Self, MissingColumns> {
        let header = parse_header(header, delimiter);
        let layout = HeaderLayout::resolve(&header, roles)?;
        Ok(Self { layout, date_format, delimiter })
    }

    pub fn layout(&self) -> &HeaderLayout {
        &self.layout
    }

    /// Parse one already-split row.
    pub fn parse_row(&self, row: &StringRecord) -> Result<(GroupKey, String), RecordError> {
        self.layout.extract(row)?.normalize(&self.date_format)
    }

    /// Parse every row in `chunk`, in order. A row that fails to decode (bad quoting,
    /// invalid UTF-8) comes back as `RecordError::Other`; the next row is still attempted.
    /// A blank line is a row with no fields and fails the width check.
    pub fn parse_chunk<'c>(
        &'c self,
        chunk: &'c [u8],
    ) -> impl Iterator<Item = Result<(GroupKey, String), RecordError>> + 'c {
        // The CSV grammar drops blank lines, so rows are delimited here first and the
        // grammar's records are paired with the non-blank ones.
        let mut records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(chunk)
            .into_records();
        RowSpans::new(chunk, self.delimiter).map(move |span| {
            if span.is_empty() {
                return Err(RecordError::FieldCount { expected: self.layout.width, found: 0 });
            }
            match records.next() {
                Some(Ok(row)) => self.parse_row(&row),
                Some(Err(e)) => {
                    tracing::debug!("row decode failed: {}", e);
                    Err(RecordError::Other)
                }
                None => Err(RecordError::Other),
            }
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SpanState {
    FieldStart,
    Field,
    Quoted,
    QuoteInQuoted,
}

/// Raw rows of a chunk, without their terminators. `\n`, `\r` and `\r\n` end a row unless
/// they sit inside a quoted field, the same rules the CSV reader applies.
struct RowSpans<'a> {
    buf: &'a [u8],
    pos: usize,
    delimiter: u8,
}

impl<'a> RowSpans<'a> {
    fn new(buf: &'a [u8], delimiter: u8) -> Self {
        Self { buf, pos: 0, delimiter }
    }
}

impl<'a> Iterator for RowSpans<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let start = self.pos;
        let mut state = SpanState::FieldStart;
        let mut i = start;
        while i < self.buf.len() {
            let b = self.buf[i];
            state = match (state, b) {
                (SpanState::Quoted, b'"') => SpanState::QuoteInQuoted,
                (SpanState::Quoted, _) => SpanState::Quoted,
                (_, b'\n') | (_, b'\r') => {
                    let mut next = i + 1;
                    if b == b'\r' && self.buf.get(next) == Some(&b'\n') {
                        next += 1;
                    }
                    self.pos = next;
                    return Some(&self.buf[start..i]);
                }
                (_, d) if d == self.delimiter => SpanState::FieldStart,
                (SpanState::FieldStart, b'"') | (SpanState::QuoteInQuoted, b'"') => SpanState::Quoted,
                _ => SpanState::Field,
            };
            i += 1;
        }
        self.pos = self.buf.len();
        Some(&self.buf[start..])
    }
}

/// Split the header line with the same grammar as the data. An unreadable header has no cells.
fn parse_header(line: &[u8], delimiter: u8) -> StringRecord {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(line);
    let mut rec = StringRecord::new();
    match rdr.read_record(&mut rec) {
        Ok(true) => rec,
        _ => StringRecord::new(),
    }
}
