use crate::period::ReportingPeriod;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Resource not found")]
    NotFound,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid CIK {0:?}: must be a 10 digit string")]
    InvalidIdentifier(String),

    #[error("Invalid quarter: must be between 1 and 4")]
    InvalidQuarter,

    #[error("Invalid reporting period {0:?}: expected a label like Q2-2022")]
    InvalidPeriod(String),

    #[error("Invalid date {value:?}: {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Malformed {document} document: missing or invalid {anchor}")]
    MalformedDocument {
        document: &'static str,
        anchor: String,
    },

    #[error("No original 13F-HR filing reports period {0}")]
    PeriodNotFound(ReportingPeriod),

    #[error("CIK {0} has no original 13F-HR filings")]
    NoHoldingsReports(String),

    #[error("Filing year {year} does not declare its value unit convention")]
    AmbiguousUnitConvention { year: i32 },

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("XML parsing error: {0}")]
    XmlError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(
        "Unexpected content type from URL {url}. Expected pattern {expected_pattern}, but got Content-Type: {got_content_type}. Content preview: {content_preview}..."
    )]
    UnexpectedContentType {
        url: String,
        expected_pattern: String,
        got_content_type: String,
        content_preview: String,
    },
}

/// Broad classification of an [`EdgarError`].
///
/// Callers that only care about what went wrong (rather than the exact cause)
/// can match on this instead of every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The investor identifier was rejected before any request was made.
    InvalidIdentifier,
    /// A document or index could not be fetched.
    RetrievalFailure,
    /// A filing document is missing a mandatory part or is not valid XML.
    MalformedDocument,
    /// No original filing reports the requested period, or none exists at all.
    PeriodNotFound,
    /// A cutover-year filing did not declare its unit convention.
    AmbiguousUnitConvention,
    /// A caller-supplied value (period label, quarter, date) is invalid.
    InvalidInput,
    Other,
}

impl EdgarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EdgarError::InvalidIdentifier(_) => ErrorKind::InvalidIdentifier,
            EdgarError::RequestError(_)
            | EdgarError::NotFound
            | EdgarError::InvalidResponse(_)
            | EdgarError::RateLimitExceeded
            | EdgarError::UnexpectedContentType { .. } => ErrorKind::RetrievalFailure,
            EdgarError::MalformedDocument { .. } | EdgarError::XmlError(_) => {
                ErrorKind::MalformedDocument
            }
            EdgarError::PeriodNotFound(_) | EdgarError::NoHoldingsReports(_) => {
                ErrorKind::PeriodNotFound
            }
            EdgarError::AmbiguousUnitConvention { .. } => ErrorKind::AmbiguousUnitConvention,
            EdgarError::InvalidQuarter
            | EdgarError::InvalidPeriod(_)
            | EdgarError::InvalidDate { .. } => ErrorKind::InvalidInput,
            EdgarError::JsonError(_) | EdgarError::ConfigError(_) => ErrorKind::Other,
        }
    }

    pub(crate) fn malformed(document: &'static str, anchor: impl Into<String>) -> Self {
        EdgarError::MalformedDocument {
            document,
            anchor: anchor.into(),
        }
    }
}

impl From<quick_xml::DeError> for EdgarError {
    fn from(error: quick_xml::DeError) -> Self {
        EdgarError::XmlError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EdgarError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Quarter;

    #[test]
    fn test_error_kinds() {
        assert_eq!(EdgarError::NotFound.kind(), ErrorKind::RetrievalFailure);
        assert_eq!(
            EdgarError::RateLimitExceeded.kind(),
            ErrorKind::RetrievalFailure
        );
        assert_eq!(
            EdgarError::InvalidIdentifier("123".to_string()).kind(),
            ErrorKind::InvalidIdentifier
        );
        assert_eq!(
            EdgarError::malformed("primary", "coverPage").kind(),
            ErrorKind::MalformedDocument
        );
        assert_eq!(
            EdgarError::XmlError("bad".to_string()).kind(),
            ErrorKind::MalformedDocument
        );
        assert_eq!(
            EdgarError::PeriodNotFound(ReportingPeriod::new(2019, Quarter::Q1)).kind(),
            ErrorKind::PeriodNotFound
        );
    }

    #[test]
    fn test_malformed_message() {
        let err = EdgarError::malformed("primary", "formData/summaryPage");
        assert_eq!(
            err.to_string(),
            "Malformed primary document: missing or invalid formData/summaryPage"
        );
    }
}
