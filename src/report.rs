//! Report emission: one CSV row per group with total complaints, distinct companies, and the
//! share of the top company.

use anyhow::Result;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io::Write;

use crate::sort::SortSpec;
use crate::tally::{GroupKey, TallyStore};

/// Derived statistics of one group, ready to be written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRow<'a> {
    pub key: &'a GroupKey,
    pub total: u64,
    pub companies: usize,
    pub percentage: u32,
}

impl<'a> ReportRow<'a> {
    /// CSV fields; `year_first` swaps the two key columns.
    pub fn fields(&self, year_first: bool) -> [String; 5] {
        let (product, year) = (self.key.product.clone(), self.key.year.to_string());
        let (first, second) = if year_first { (year, product) } else { (product, year) };
        [first, second, self.total.to_string(), self.companies.to_string(), self.percentage.to_string()]
    }
}

/// `max / total * 100`, rounded to the nearest integer with ties to even, in exact
/// integer arithmetic. Returns 0 for an empty group.
///
/// Ties are exact ties: 23/40 is 57.5 and rounds to 58, even though the same ratio
/// computed in `f64` comes out as 57.49999999999999.
pub fn percentage(max: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = u128::from(max) * 100;
    let total = u128::from(total);
    let (q, r) = (scaled / total, scaled % total);
    let round_up = match (2 * r).cmp(&total) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Equal => q % 2 == 1,
        std::cmp::Ordering::Less => false,
    };
    (q + u128::from(round_up)) as u32
}

/// Compute one row per group, in report order.
///
/// With `sort == None` rows follow the store's traversal order (first-seen order of keys).
/// That order is an implementation detail; only "every key exactly once" is promised.
pub fn build_rows(store: &TallyStore, sort: Option<SortSpec>) -> Vec<ReportRow<'_>> {
    let mut rows: Vec<ReportRow<'_>> = store
        .iter()
        .map(|(key, tally)| {
            let total = tally.total();
            ReportRow { key, total, companies: tally.distinct(), percentage: percentage(tally.max_count(), total) }
        })
        .collect();
    if let Some(spec) = sort {
        rows.sort_by(|a, b| spec.compare(a.key, b.key));
    }
    rows
}

/// Write the report as headerless CSV with minimal quoting. Returns the number of rows.
pub fn write_report<W: Write>(store: &TallyStore, sort: Option<SortSpec>, delimiter: u8, out: W) -> Result<usize> {
    let year_first = sort.map(SortSpec::year_first).unwrap_or(false);
    let terminator = if cfg!(windows) { Terminator::CRLF } else { Terminator::Any(b'\n') };
    let mut w = WriterBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .terminator(terminator)
        .from_writer(out);

    let rows = build_rows(store, sort);
    for row in &rows {
        w.write_record(row.fields(year_first))?;
    }
    w.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_from(entries: &[(&str, i32, &str, usize)]) -> TallyStore {
        let mut store = TallyStore::new();
        for (product, year, company, n) in entries {
            for _ in 0..*n {
                store.update(GroupKey::new(*product, *year), company.to_string());
            }
        }
        store
    }

    fn render(store: &TallyStore, sort: Option<SortSpec>) -> String {
        let mut buf = Vec::new();
        write_report(store, sort, b',', &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn percentage_rounds_half_to_even() {
        assert_eq!(percentage(7, 10), 70);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 12); // 12.5
        assert_eq!(percentage(3, 8), 38); // 37.5
        assert_eq!(percentage(23, 40), 58); // 57.5, not the f64 57.4999...
        assert_eq!(percentage(5, 5), 100);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn derived_columns() {
        let store = store_from(&[("mortgage", 2019, "a", 3), ("mortgage", 2019, "b", 7)]);
        let rows = build_rows(&store, Some(SortSpec::ProductYear));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total, 10);
        assert_eq!(rows[0].companies, 2);
        assert_eq!(rows[0].percentage, 70);
        assert_eq!(render(&store, Some(SortSpec::ProductYear)).trim_end(), "mortgage,2019,10,2,70");
    }

    #[test]
    fn sort_specs_control_order_and_columns() {
        let store = store_from(&[
            ("loans", 2020, "x", 1),
            ("credit card", 2019, "x", 1),
            ("credit card", 2020, "x", 1),
        ]);

        let lines: Vec<String> = render(&store, Some(SortSpec::ProductYear)).lines().map(String::from).collect();
        assert_eq!(lines, vec!["credit card,2019,1,1,100", "credit card,2020,1,1,100", "loans,2020,1,1,100"]);

        let lines: Vec<String> = render(&store, Some(SortSpec::YearProduct)).lines().map(String::from).collect();
        assert_eq!(lines, vec!["2019,credit card,1,1,100", "2020,credit card,1,1,100", "2020,loans,1,1,100"]);

        let lines: Vec<String> = render(&store, Some(SortSpec::Year)).lines().map(String::from).collect();
        assert_eq!(lines[0], "2019,credit card,1,1,100");
        assert!(lines[1..].iter().all(|l| l.starts_with("2020,")));

        let lines: Vec<String> = render(&store, Some(SortSpec::Product)).lines().map(String::from).collect();
        assert!(lines[..2].iter().all(|l| l.starts_with("credit card,")));
        assert!(lines[2].starts_with("loans,2020,"));
    }

    #[test]
    fn unsorted_emits_every_key_once() {
        let store = store_from(&[("b", 2001, "x", 2), ("a", 2000, "y", 1), ("c", 1999, "z", 4)]);
        let mut lines: Vec<String> = render(&store, None).lines().map(String::from).collect();
        lines.sort();
        assert_eq!(lines, vec!["a,2000,1,1,100", "b,2001,2,1,100", "c,1999,4,1,100"]);
    }

    #[test]
    fn minimal_quoting() {
        let store = store_from(&[("loans, student", 2020, "x", 1), ("say \"hi\"", 2020, "x", 1)]);
        let out = render(&store, Some(SortSpec::ProductYear));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["\"loans, student\",2020,1,1,100", "\"say \"\"hi\"\"\",2020,1,1,100"]);
    }

    #[test]
    fn empty_store_writes_nothing() {
        assert_eq!(render(&TallyStore::new(), Some(SortSpec::ProductYear)), "");
    }
}
