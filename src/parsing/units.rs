//! Monetary unit convention of a 13F filing.
//!
//! Until the cutover year filers reported values in thousands of dollars;
//! afterwards in whole dollars. Filings made during the cutover year could use
//! either, and the rendered cover page says which: the dollar convention
//! carries the phrase "nearest dollar". When that phrase is missing the filing
//! is treated as reporting in thousands. This default is a heuristic, not
//! something the filing states.

use crate::error::{EdgarError, Result};
use serde::Serialize;

const DOLLAR_PHRASE: &str = "nearest dollar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnitMultiplier {
    /// Raw figures are thousands of dollars.
    Thousands,
    /// Raw figures are whole dollars.
    Dollars,
}

impl UnitMultiplier {
    pub fn factor(&self) -> u64 {
        match self {
            UnitMultiplier::Thousands => 1000,
            UnitMultiplier::Dollars => 1,
        }
    }

    /// Converts a raw reported figure to whole dollars. `None` on overflow.
    pub fn apply(&self, raw: u64) -> Option<u64> {
        raw.checked_mul(self.factor())
    }

    /// Whether a filing from `filing_year` must declare its convention in the
    /// rendered document, i.e. whether that document needs fetching at all.
    pub fn requires_declaration(filing_year: i32, cutover_year: i32) -> bool {
        filing_year == cutover_year
    }

    /// Reads the declared convention from a rendered document.
    ///
    /// Strict: a document without the dollar phrase is
    /// `EdgarError::AmbiguousUnitConvention`.
    pub fn declared(filing_year: i32, rendered: &str) -> Result<Self> {
        if rendered.to_lowercase().contains(DOLLAR_PHRASE) {
            Ok(UnitMultiplier::Dollars)
        } else {
            Err(EdgarError::AmbiguousUnitConvention { year: filing_year })
        }
    }

    /// Picks the multiplier for a filing.
    ///
    /// The rendered document is only consulted in the cutover year; an
    /// ambiguous or missing declaration there falls back to `Thousands`.
    pub fn for_filing(filing_year: i32, cutover_year: i32, rendered: Option<&str>) -> Self {
        if filing_year < cutover_year {
            return UnitMultiplier::Thousands;
        }
        if filing_year > cutover_year {
            return UnitMultiplier::Dollars;
        }

        let declared = match rendered {
            Some(text) => Self::declared(filing_year, text),
            None => Err(EdgarError::AmbiguousUnitConvention { year: filing_year }),
        };
        match declared {
            Ok(multiplier) => multiplier,
            Err(err) => {
                tracing::warn!("{}; assuming values in thousands", err);
                UnitMultiplier::Thousands
            }
        }
    }
}
