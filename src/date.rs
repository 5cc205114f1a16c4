//! Received-date handling: compile a `time` format description once, then pull the year
//! out of each date field.

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;
use time::format_description::{self, OwnedFormatItem};
use time::parsing::Parsed;
use time::Date;

/// Equivalent of `YYYY-MM-DD`, written in `time`'s format-description syntax. Month and day
/// take one or two digits, so `2019-5-3` and `2019-05-03` both match.
pub const DEFAULT_DATE_FORMAT: &str = "[year]-[month padding:none]-[day padding:none]";

/// Why a date field could not be turned into a year.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateError {
    /// The value does not match the pattern (or names an impossible calendar day).
    Mismatch,
    /// The value matched, but the pattern carries no year component.
    NoYear,
}

/// A compiled date pattern.
#[derive(Clone, Debug)]
pub struct DateFormat {
    pattern: String,
    item: OwnedFormatItem,
}

impl DateFormat {
    pub fn new(pattern: &str) -> Result<Self> {
        let item = format_description::parse_owned::<1>(pattern)
            .map_err(|e| anyhow!("invalid date format {:?}: {}", pattern, e))?;
        Ok(Self { pattern: pattern.to_string(), item })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Year of `value` under this pattern. The whole value must be consumed.
    pub fn year_of(&self, value: &str) -> Result<i32, DateError> {
        let mut parsed = Parsed::new();
        let rest = parsed
            .parse_item(value.as_bytes(), &self.item)
            .map_err(|_| DateError::Mismatch)?;
        if !rest.is_empty() {
            return Err(DateError::Mismatch);
        }
        let year = parsed.year().ok_or(DateError::NoYear)?;
        // "2020-02-30" matches the shape but is not a day.
        if let (Some(month), Some(day)) = (parsed.month(), parsed.day()) {
            Date::from_calendar_date(year, month, day.get()).map_err(|_| DateError::Mismatch)?;
        }
        Ok(year)
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl FromStr for DateFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).map_err(|e| e.to_string())
    }
}
