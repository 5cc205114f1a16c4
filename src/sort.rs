//! Sort specifications for the report: which key component orders the rows, and which
//! one is written first.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::tally::GroupKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortSpec {
    /// Product ascending; columns (product, year).
    Product,
    /// Year ascending; columns (year, product).
    Year,
    /// Product then year; columns (product, year).
    #[default]
    ProductYear,
    /// Year then product; columns (year, product).
    YearProduct,
}

impl SortSpec {
    /// True when the year column is written before the product column.
    pub fn year_first(self) -> bool {
        matches!(self, SortSpec::Year | SortSpec::YearProduct)
    }

    /// Row ordering. Single-component specs compare only that component; callers use a
    /// stable sort so ties keep their incoming order.
    pub fn compare(self, a: &GroupKey, b: &GroupKey) -> Ordering {
        match self {
            SortSpec::Product => a.product.cmp(&b.product),
            SortSpec::Year => a.year.cmp(&b.year),
            SortSpec::ProductYear => a.product.cmp(&b.product).then(a.year.cmp(&b.year)),
            SortSpec::YearProduct => a.year.cmp(&b.year).then_with(|| a.product.cmp(&b.product)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortSpec::Product => "product",
            SortSpec::Year => "year",
            SortSpec::ProductYear => "product,year",
            SortSpec::YearProduct => "year,product",
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the digit forms `0`, `1`, `01`, `10` (0 = product, 1 = year) and the named
/// forms `product`, `year`, `product,year`, `year,product`.
impl FromStr for SortSpec {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_ascii_lowercase();
        match norm.as_str() {
            "0" | "product" | "(product)" => Ok(SortSpec::Product),
            "1" | "year" | "(year)" => Ok(SortSpec::Year),
            "01" | "product,year" | "(product,year)" => Ok(SortSpec::ProductYear),
            "10" | "year,product" | "(year,product)" => Ok(SortSpec::YearProduct),
            _ => Err(format!(
                "invalid sort {:?} (expected 0, 1, 01, 10, product, year, product,year, year,product or none)",
                s
            )),
        }
    }
}

/// Like `SortSpec::from_str`, plus `none` (or an empty string) to turn sorting off.
pub fn parse_sort_option(s: &str) -> Result<Option<SortSpec>, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "none" | "off" => Ok(None),
        other => other.parse().map(Some),
    }
}
