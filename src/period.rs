// 📅 Period Model
// Strict calendar months ("YYYY-MM") used as the time axis of every series

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("invalid period '{value}': expected YYYY-MM")]
    Malformed { value: String },

    #[error("month {month} out of range (1-12)")]
    MonthOutOfRange { month: u32 },
}

// ============================================================================
// YEAR MONTH
// ============================================================================

/// YearMonth - A calendar month with no day component
///
/// Ordering is chronological (year first, then month), so sorting a
/// `Vec<YearMonth>` gives the time axis directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::MonthOutOfRange { month });
        }
        Ok(YearMonth { year, month })
    }

    /// Construct from parts already known to be valid
    pub(crate) const fn new_unchecked(year: i32, month: u32) -> Self {
        YearMonth { year, month }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Month containing the given date
    pub fn from_date(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the month
    pub fn first_day(&self) -> NaiveDate {
        // month is validated on construction, day 1 always exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Last day of the month
    pub fn last_day(&self) -> NaiveDate {
        let first = self.first_day();
        self.succ().first_day().pred_opt().unwrap_or(first)
    }

    /// Months since year 0, used for lag arithmetic
    fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_ordinal(ordinal: i64) -> Self {
        YearMonth {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    /// Shift by a (possibly negative) number of months
    pub fn add_months(&self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() + months)
    }

    /// Next calendar month
    pub fn succ(&self) -> Self {
        self.add_months(1)
    }

    /// Signed distance in months: `self - earlier`
    pub fn months_since(&self, earlier: &YearMonth) -> i64 {
        self.ordinal() - earlier.ordinal()
    }

    /// Every month from `start` to `end` inclusive (empty if `end < start`)
    pub fn range_inclusive(start: YearMonth, end: YearMonth) -> Vec<YearMonth> {
        let span = end.months_since(&start);
        if span < 0 {
            return Vec::new();
        }
        (0..=span).map(|offset| start.add_months(offset)).collect()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = PeriodError;

    /// Strict parse: exactly four year digits, a dash, two month digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PeriodError::Malformed {
            value: s.to_string(),
        };

        let bytes = s.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(malformed());
        }
        let digits_ok = bytes[..4].iter().chain(&bytes[5..]).all(u8::is_ascii_digit);
        if !digits_ok {
            return Err(malformed());
        }

        let year: i32 = s[..4].parse().map_err(|_| malformed())?;
        let month: u32 = s[5..].parse().map_err(|_| malformed())?;

        YearMonth::new(year, month).map_err(|_| malformed())
    }
}

impl TryFrom<String> for YearMonth {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================
