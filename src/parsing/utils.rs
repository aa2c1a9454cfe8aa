use crate::error::{EdgarError, Result};
use crate::holdings::NOT_AVAILABLE;
use chrono::NaiveDate;

/// Trimmed text of an optional node, or [`NOT_AVAILABLE`] when absent or blank.
pub fn text_or_na(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

/// Trimmed text of an optional node, `None` when absent or blank.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parses a mandatory non-negative integer node. Thousands separators are tolerated.
pub fn required_u64(value: Option<&str>, document: &'static str, anchor: &str) -> Result<u64> {
    let raw = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EdgarError::malformed(document, anchor))?;
    raw.replace(',', "")
        .parse::<u64>()
        .map_err(|_| EdgarError::malformed(document, format!("{} (unparseable {:?})", anchor, raw)))
}

/// Parses an EDGAR form date. 13F documents write `MM-DD-YYYY`; ISO dates are accepted too.
pub fn parse_form_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%m-%d-%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|source| EdgarError::InvalidDate {
            value: value.to_string(),
            source,
        })
}
