//! Trait seams between the reconciliation engine and EDGAR.
//!
//! [`FilingOperations`] is the low-level EDGAR surface the [`Edgar`](crate::Edgar)
//! client implements: submissions, filtered filing lists and filing directories.
//!
//! [`HoldingsSource`] is what the [`FilingStore`](crate::FilingStore) actually
//! depends on: a filer's 13F index, the documents of one filing, and raw fetches.
//! `Edgar` implements it on top of `FilingOperations`; tests implement it over
//! in-memory fixtures.

use super::error::Result;
use super::filings::{DetailedFiling, DirectoryResponse, DocumentSet, RecentFilings, Submission};
use super::index::{Cik, FilingIndexEntry};
use super::options::FilingOptions;
use async_trait::async_trait;

/// Operations for accessing SEC filings and related documents.
#[async_trait]
pub trait FilingOperations {
    /// Retrieves all submissions for a specific company identified by CIK.
    async fn submissions(&self, cik: &str) -> Result<Submission>;
    /// Retrieves one older page of a company's filing history by file name.
    async fn submission_page(&self, name: &str) -> Result<RecentFilings>;
    /// Helper function to get recent filings in a form of a Vec.
    async fn get_recent_filings(&self, cik: &str) -> Result<Vec<DetailedFiling>>;
    /// Retrieves a list of filings for a specific company identified by CIK.
    async fn filings(&self, cik: &str, opts: Option<FilingOptions>) -> Result<Vec<DetailedFiling>>;
    /// Retrieves the directory structure for a specific filing.
    async fn filing_directory(
        &self,
        cik: &str,
        accession_number: &str,
    ) -> Result<DirectoryResponse>;
}

/// Where 13F filings and their documents come from.
///
/// Implementations must be shareable across tasks: the store resolves several
/// periods concurrently against one source.
#[async_trait]
pub trait HoldingsSource: Send + Sync {
    /// Every 13F-HR and 13F-HR/A filing of `cik`, in any order.
    async fn holdings_index(&self, cik: &Cik) -> Result<Vec<FilingIndexEntry>>;
    /// Locates the primary, information table and rendered documents of a filing.
    async fn resolve_documents(&self, entry: &FilingIndexEntry) -> Result<DocumentSet>;
    /// Fetches one document by URL.
    async fn fetch(&self, url: &str) -> Result<String>;
}
