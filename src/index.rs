//! The 13F filing index of a single filer.
//!
//! EDGAR lists every filing a CIK has made. For holdings reports only two form
//! types matter: the original `13F-HR` and its amendment `13F-HR/A`. This module
//! holds that list in a shape the [`FilingStore`](crate::FilingStore) can query:
//! most recent first, partitioned by [`FilingKind`], with lookups by attributed
//! [`ReportingPeriod`].

use crate::error::{EdgarError, Result};
use crate::period::ReportingPeriod;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Form type of an original quarterly holdings report.
pub const HOLDINGS_REPORT_FORM: &str = "13F-HR";

/// Form type of an amendment to a quarterly holdings report.
pub const HOLDINGS_AMENDMENT_FORM: &str = "13F-HR/A";

/// A validated Central Index Key.
///
/// Accepted only as the 10 digit, zero-padded form the SEC prints on filings
/// (e.g. `0001067983`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Cik(String);

impl Cik {
    pub fn parse(cik: &str) -> Result<Self> {
        if cik.len() == 10 && cik.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(cik.to_string()))
        } else {
            Err(EdgarError::InvalidIdentifier(cik.to_string()))
        }
    }

    /// The 10 digit form, as used by the submissions API.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The CIK without leading zeros, as used in archive paths.
    pub fn unpadded(&self) -> &str {
        let trimmed = self.0.trim_start_matches('0');
        if trimmed.is_empty() { "0" } else { trimmed }
    }
}

impl FromStr for Cik {
    type Err = EdgarError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FilingKind {
    Original,
    Amendment,
}

impl FilingKind {
    /// Classifies a form type. Anything other than 13F-HR / 13F-HR/A is `None`.
    pub fn from_form(form: &str) -> Option<Self> {
        match form.trim() {
            HOLDINGS_REPORT_FORM => Some(FilingKind::Original),
            HOLDINGS_AMENDMENT_FORM => Some(FilingKind::Amendment),
            _ => None,
        }
    }
}

/// Where a filing's documents live: a filer and an accession number.
///
/// Opaque to the reconciliation engine; only a [`HoldingsSource`](crate::HoldingsSource)
/// knows how to turn it into document URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DocumentLocation {
    pub cik: Cik,
    pub accession_number: String,
}

/// One row of a filer's 13F filing index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilingIndexEntry {
    pub filing_date: NaiveDate,
    pub kind: FilingKind,
    pub location: DocumentLocation,
}

impl FilingIndexEntry {
    pub fn accession_number(&self) -> &str {
        &self.location.accession_number
    }

    /// The period this filing describes, judged by its filing date alone.
    pub fn attributed_period(&self) -> ReportingPeriod {
        ReportingPeriod::from_filing_date(self.filing_date)
    }
}

/// A filer's 13F filings, most recent first.
#[derive(Debug, Clone, Default)]
pub struct FilingIndex {
    entries: Vec<FilingIndexEntry>,
}

impl FilingIndex {
    /// Builds an index, ordering entries by filing date, newest first.
    ///
    /// The sort is stable, so same-day filings keep the order the source gave them.
    pub fn new(mut entries: Vec<FilingIndexEntry>) -> Self {
        entries.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));
        Self { entries }
    }

    pub fn entries(&self) -> &[FilingIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn originals(&self) -> impl Iterator<Item = &FilingIndexEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind == FilingKind::Original)
    }

    pub fn amendments(&self) -> impl Iterator<Item = &FilingIndexEntry> {
        self.entries
            .iter()
            .filter(|e| e.kind == FilingKind::Amendment)
    }

    /// The most recently filed original report.
    pub fn latest_original(&self) -> Option<&FilingIndexEntry> {
        self.originals().next()
    }

    /// The most recently filed original whose filing date attributes to `period`.
    pub fn original_for_period(&self, period: ReportingPeriod) -> Option<&FilingIndexEntry> {
        self.originals()
            .find(|entry| entry.attributed_period() == period)
    }

    /// Amendments filed on or after `date`, earliest first.
    pub fn amendments_since(&self, date: NaiveDate) -> Vec<&FilingIndexEntry> {
        let mut amendments: Vec<_> = self
            .amendments()
            .filter(|entry| entry.filing_date >= date)
            .collect();
        // same-day filings arrive newest first, so reverse before the stable sort
        amendments.reverse();
        amendments.sort_by_key(|entry| entry.filing_date);
        amendments
    }
}
