//! # edgar13f - SEC Form 13F holdings, reconciled
//!
//! Institutional investment managers report their US equity positions every
//! quarter on Form 13F-HR, and correct or extend those reports with 13F-HR/A
//! amendments. This crate retrieves a manager's filings from SEC EDGAR and
//! turns them into one authoritative snapshot per reporting period.
//!
//! ## Features
//!
//! - **Rate-limited HTTP client** - Complies with SEC.gov fair access rules
//! - **Quarter attribution** - Maps filing dates and declared periods of report to quarters
//! - **13F parsing** - Cover page, signature block and information table, with
//!   values normalized to whole dollars across the 2023 unit change
//! - **Amendment reconciliation** - New-holdings amendments are merged,
//!   restatements replace the original
//! - **Per-period cache** - Each period is resolved once, concurrent requests coalesce
//!
//! ## Requirements
//!
//! The crate is async and runs on [tokio](https://tokio.rs).
//!
//! ## Basic Usage
//!
//! ```ignore
//! use edgar13f::{Edgar, FilingStore, ReportingPeriod, TableDetail};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Initialize with a proper user agent (required by SEC.gov)
//!     let edgar = Edgar::new("YourAppName contact@example.com")?;
//!     let store = FilingStore::new(edgar, "0001067983")?;
//!
//!     let latest = store.latest().await?;
//!     println!(
//!         "{}: ${} across {} holdings",
//!         latest.cover_page().manager_name,
//!         latest.cover_page().portfolio_value,
//!         latest.cover_page().holding_count
//!     );
//!
//!     let period: ReportingPeriod = "Q2-2022".parse()?;
//!     let table = store.for_period(period).await?.to_table(TableDetail::Simplified);
//!     println!("{} securities in {}", table.len(), period);
//!
//!     Ok(())
//! }
//! ```

mod amendments;
mod config;
mod core;
mod error;
mod filings;
mod holdings;
mod index;
mod options;
pub mod parsing;
mod period;
mod store;
mod traits;

pub use amendments::apply_amendment;
pub use config::{EdgarConfig, EdgarUrls, RENDERED_STYLESHEET_DIR, StoreConfig, UNIT_CUTOVER_YEAR};
pub use self::core::Edgar;
pub use error::{EdgarError, ErrorKind, Result};
pub use filings::{
    DetailedFiling, Directory, DirectoryItem, DirectoryResponse, DocumentSet, FilingFile,
    FilingsData, PRIMARY_DOCUMENT, RecentFilings, Submission, holdings_entries,
};
pub use holdings::{
    AmendmentType, AmountType, CoverPage, HoldingLine, HoldingsTable, NOT_AVAILABLE,
    ResolvedFiling, SignatureBlock, SimplifiedHolding, TableDetail, simplify,
};
pub use index::{
    Cik, DocumentLocation, FilingIndex, FilingIndexEntry, FilingKind, HOLDINGS_AMENDMENT_FORM,
    HOLDINGS_REPORT_FORM,
};
pub use options::FilingOptions;
pub use parsing::units::UnitMultiplier;
pub use period::{Quarter, ReportingPeriod};
pub use store::FilingStore;
pub use traits::{FilingOperations, HoldingsSource};

/// Current crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
