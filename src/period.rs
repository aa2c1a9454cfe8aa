//! Reporting periods and quarter attribution.
//!
//! A 13F-HR describes the holdings at the end of a calendar quarter and is filed
//! during the quarter that follows it. Two different dates therefore point at the
//! same period, and each needs its own rule:
//!
//! - the **filing date** (from the filing index) falls one quarter *after* the
//!   period, see [`ReportingPeriod::from_filing_date`];
//! - the **period of report** (declared inside the filing) falls *inside* the
//!   period, see [`ReportingPeriod::from_period_of_report`].
//!
//! ```rust
//! use chrono::NaiveDate;
//! use edgar13f::{Quarter, ReportingPeriod};
//!
//! let filed = NaiveDate::from_ymd_opt(2022, 2, 10).unwrap();
//! assert_eq!(ReportingPeriod::from_filing_date(filed), ReportingPeriod::new(2021, Quarter::Q4));
//! assert_eq!("Q4-2021".parse::<ReportingPeriod>().unwrap().to_string(), "Q4-2021");
//! ```

use crate::error::{EdgarError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Calendar quarter (Q1-Q4).
///
/// Each quarter covers three months:
/// - Q1: January through March
/// - Q2: April through June
/// - Q3: July through September
/// - Q4: October through December
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quarter {
    Q1 = 1,
    Q2 = 2,
    Q3 = 3,
    Q4 = 4,
}

impl Quarter {
    /// Creates a Quarter from its index (1-4).
    pub fn from_index(index: u32) -> Result<Self> {
        match index {
            1 => Ok(Quarter::Q1),
            2 => Ok(Quarter::Q2),
            3 => Ok(Quarter::Q3),
            4 => Ok(Quarter::Q4),
            _ => Err(EdgarError::InvalidQuarter),
        }
    }

    /// Converts the quarter to its integer representation (1-4).
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }
}

/// The quarter a filing's holdings describe, e.g. `Q2-2022`.
///
/// Ordering is chronological, so a `BTreeMap` keyed by periods iterates oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportingPeriod {
    year: i32,
    quarter: Quarter,
}

impl ReportingPeriod {
    pub fn new(year: i32, quarter: Quarter) -> Self {
        Self { year, quarter }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> Quarter {
        self.quarter
    }

    /// Attributes a filing to the period it describes, given the date it was filed.
    ///
    /// Filings land in the quarter after the one they describe, so the described
    /// quarter is the filing quarter minus one. A filing made in January-March
    /// describes Q4 of the previous year.
    pub fn from_filing_date(filing_date: NaiveDate) -> Self {
        let year = filing_date.year();
        // month0 / 3 is the zero-based filing quarter
        let (quarter, year) = match filing_date.month0() / 3 {
            0 => (Quarter::Q4, year - 1),
            1 => (Quarter::Q1, year),
            2 => (Quarter::Q2, year),
            _ => (Quarter::Q3, year),
        };
        Self { year, quarter }
    }

    /// Attributes a filing to a period from its declared period-of-report date.
    ///
    /// That date already lies inside the described period (it is the quarter end),
    /// so the quarter is `month / 3` and the year is taken as is. January and
    /// February yield quarter 0 and are rejected with `InvalidQuarter`.
    pub fn from_period_of_report(period_of_report: NaiveDate) -> Result<Self> {
        let quarter = Quarter::from_index(period_of_report.month() / 3)?;
        Ok(Self {
            year: period_of_report.year(),
            quarter,
        })
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}-{}", self.quarter.as_u32(), self.year)
    }
}

impl FromStr for ReportingPeriod {
    type Err = EdgarError;

    /// Parses labels of the form `Q<1-4>-<year>`, case-insensitive on the `Q`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EdgarError::InvalidPeriod(s.to_string());
        let trimmed = s.trim();
        let rest = trimmed
            .strip_prefix('Q')
            .or_else(|| trimmed.strip_prefix('q'))
            .ok_or_else(invalid)?;
        let (quarter, year) = rest.split_once('-').ok_or_else(invalid)?;
        let quarter = quarter.parse::<u32>().map_err(|_| invalid())?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        if year.to_string().len() != 4 {
            return Err(invalid());
        }
        Ok(Self {
            year,
            quarter: Quarter::from_index(quarter).map_err(|_| invalid())?,
        })
    }
}

impl Serialize for ReportingPeriod {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReportingPeriod {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
