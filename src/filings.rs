use super::error::{EdgarError, Result};
use super::index::{Cik, DocumentLocation, FilingIndexEntry, FilingKind, HOLDINGS_REPORT_FORM};
use super::options::FilingOptions;
use super::traits::{FilingOperations, HoldingsSource};
use super::Edgar;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use std::collections::HashSet;

/// File name of the structured primary document inside a 13F filing directory.
pub const PRIMARY_DOCUMENT: &str = "primary_doc.xml";

const DIRECTORY: &str = "filing directory";

#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub cik: String,
    #[serde(rename = "entityType")]
    pub entity_type: Option<String>,
    pub name: String,
    #[serde(default)]
    pub tickers: Vec<String>,
    pub filings: FilingsData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilingsData {
    pub recent: RecentFilings,
    #[serde(default)]
    pub files: Vec<FilingFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilingFile {
    pub name: String,
    #[serde(rename = "filingCount")]
    pub filing_count: u64,
    #[serde(rename = "filingFrom")]
    pub filing_from: String,
    #[serde(rename = "filingTo")]
    pub filing_to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentFilings {
    #[serde(rename = "accessionNumber")]
    pub accession_number: Vec<String>,
    #[serde(rename = "filingDate")]
    pub filing_date: Vec<String>,
    #[serde(rename = "reportDate")]
    pub report_date: Option<Vec<String>>,
    #[serde(rename = "acceptanceDateTime")]
    pub acceptance_date_time: Vec<String>,
    pub form: Vec<String>,
    #[serde(rename = "primaryDocument")]
    pub primary_document: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct DetailedFiling {
    pub accession_number: String,
    pub filing_date: String,
    pub report_date: Option<String>,
    pub acceptance_date_time: DateTime<FixedOffset>,
    pub form: String,
    pub primary_document: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryResponse {
    pub directory: Directory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Directory {
    pub item: Vec<DirectoryItem>,
    pub name: String,
    #[serde(rename = "parent-dir")]
    pub parent_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryItem {
    #[serde(rename = "last-modified")]
    pub last_modified: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub size: String,
}

/// URLs of the three documents the store reads for one 13F filing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSet {
    /// Structured cover page (`primary_doc.xml`).
    pub primary: String,
    /// Information table XML.
    pub holdings: String,
    /// Primary document rendered through the SEC stylesheet.
    pub rendered: String,
}

impl Submission {
    /// File names of the older filing pages listed under `filings.files`.
    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.filings.files.iter().map(|file| file.name.as_str())
    }
}

impl RecentFilings {
    fn get_vec_item_at<T: Clone>(&self, vec_opt: &Option<Vec<T>>, idx: usize) -> Option<T> {
        vec_opt.as_ref().and_then(|v| v.get(idx).cloned())
    }

    /// Every row of the block as a [`DetailedFiling`].
    ///
    /// Rows that cannot be converted (short columns, bad acceptance timestamps)
    /// are skipped.
    pub fn detailed(&self) -> Vec<DetailedFiling> {
        let mut detailed_filings = Vec::with_capacity(self.accession_number.len());
        for idx in 0..self.accession_number.len() {
            match DetailedFiling::try_from((self, idx)) {
                Ok(filing) => detailed_filings.push(filing),
                Err(err) => tracing::warn!("Skipping filing row #{}: {}", idx, err),
            }
        }
        detailed_filings
    }
}

/// Builds 13F index entries from the recent block and any older pages of a
/// filer's submission history.
///
/// Only 13F-HR and 13F-HR/A rows are kept. A filing listed on more than one
/// page is indexed once.
pub fn holdings_entries(cik: &Cik, pages: &[RecentFilings]) -> Vec<FilingIndexEntry> {
    let opts = FilingOptions::new().with_form_type(HOLDINGS_REPORT_FORM);
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for filing in pages.iter().flat_map(RecentFilings::detailed) {
        if !opts.matches_form(&filing.form) || !seen.insert(filing.accession_number.clone()) {
            continue;
        }
        match FilingIndexEntry::try_from((cik, &filing)) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(
                    "Skipping filing {} of {}: {}",
                    filing.accession_number,
                    cik,
                    err
                );
            }
        }
    }

    entries
}

impl TryFrom<(&RecentFilings, usize)> for DetailedFiling {
    type Error = EdgarError;

    fn try_from((recent, idx): (&RecentFilings, usize)) -> Result<Self> {
        let column = |values: &[String], name: &str| -> Result<String> {
            values.get(idx).cloned().ok_or_else(|| {
                EdgarError::InvalidResponse(format!("recent filings column {} is short", name))
            })
        };
        let acceptance = column(&recent.acceptance_date_time, "acceptanceDateTime")?;
        let acceptance_date_time = DateTime::parse_from_rfc3339(&acceptance).map_err(|source| {
            EdgarError::InvalidDate {
                value: acceptance.clone(),
                source,
            }
        })?;

        Ok(DetailedFiling {
            accession_number: column(&recent.accession_number, "accessionNumber")?,
            filing_date: column(&recent.filing_date, "filingDate")?,
            report_date: recent.get_vec_item_at(&recent.report_date, idx),
            acceptance_date_time,
            form: column(&recent.form, "form")?,
            primary_document: recent.get_vec_item_at(&recent.primary_document, idx),
        })
    }
}

impl TryFrom<(&Cik, &DetailedFiling)> for FilingIndexEntry {
    type Error = EdgarError;

    fn try_from((cik, filing): (&Cik, &DetailedFiling)) -> Result<Self> {
        let kind = FilingKind::from_form(&filing.form).ok_or_else(|| {
            EdgarError::InvalidResponse(format!("{} is not a 13F holdings form", filing.form))
        })?;
        let filing_date = NaiveDate::parse_from_str(&filing.filing_date, "%Y-%m-%d").map_err(
            |source| EdgarError::InvalidDate {
                value: filing.filing_date.clone(),
                source,
            },
        )?;

        Ok(FilingIndexEntry {
            filing_date,
            kind,
            location: DocumentLocation {
                cik: cik.clone(),
                accession_number: filing.accession_number.clone(),
            },
        })
    }
}

impl DirectoryResponse {
    /// Picks the primary and information table documents out of a 13F filing directory.
    ///
    /// The information table is the one XML file that is not `primary_doc.xml`;
    /// its name is chosen by the filer.
    pub fn holdings_documents(&self) -> Result<(&DirectoryItem, &DirectoryItem)> {
        let primary = self
            .directory
            .item
            .iter()
            .find(|item| item.name.eq_ignore_ascii_case(PRIMARY_DOCUMENT))
            .ok_or_else(|| EdgarError::malformed(DIRECTORY, PRIMARY_DOCUMENT))?;
        let holdings = self
            .directory
            .item
            .iter()
            .find(|item| {
                !item.name.eq_ignore_ascii_case(PRIMARY_DOCUMENT)
                    && item.name.to_ascii_lowercase().ends_with(".xml")
            })
            .ok_or_else(|| EdgarError::malformed(DIRECTORY, "information table .xml"))?;
        Ok((primary, holdings))
    }
}

#[derive(Debug)]
enum UrlType {
    Submission,
    SubmissionPage,
    FilingDirectory,
    FilingContent,
    RenderedDocument,
}

impl Edgar {
    fn build_url(&self, url_type: UrlType, params: &[&str]) -> String {
        match url_type {
            UrlType::Submission => {
                let cik = format!("{:0>10}", params[0]);
                format!("{}/submissions/CIK{}.json", self.edgar_data_url, cik)
            }
            UrlType::SubmissionPage => {
                format!("{}/submissions/{}", self.edgar_data_url, params[0])
            }
            UrlType::FilingDirectory => {
                let (cik, acc_no) = (params[0], params[1]);
                let formatted_acc = acc_no.replace("-", "");
                format!(
                    "{}/data/{}/{}/index.json",
                    self.edgar_archives_url, cik, formatted_acc
                )
            }
            UrlType::FilingContent => {
                let (cik, acc_no, filename) = (params[0], params[1], params[2]);
                let formatted_acc = acc_no.replace("-", "");
                format!(
                    "{}/data/{}/{}/{}",
                    self.edgar_archives_url, cik, formatted_acc, filename
                )
            }
            UrlType::RenderedDocument => {
                // {archives}/data/{cik}/{acc_no_no_dashes}/{stylesheet_dir}/primary_doc.xml
                let (cik, acc_no) = (params[0], params[1]);
                let formatted_acc = acc_no.replace("-", "");
                format!(
                    "{}/data/{}/{}/{}/{}",
                    self.edgar_archives_url,
                    cik,
                    formatted_acc,
                    self.rendered_stylesheet_dir,
                    PRIMARY_DOCUMENT
                )
            }
        }
    }
}

#[async_trait]
impl FilingOperations for Edgar {
    /// Retrieves submission history for a given CIK.
    ///
    /// # Errors
    ///
    /// * `EdgarError::NotFound` - If the submission details for the given CIK are not found.
    /// * `EdgarError::JsonError` - If the response data is malformed.
    async fn submissions(&self, cik: &str) -> Result<Submission> {
        let url = self.build_url(UrlType::Submission, &[cik]);
        let response = self.get(&url).await?;
        Ok(serde_json::from_str::<Submission>(&response)?)
    }

    /// Retrieves one of the older filing pages listed in a submission's
    /// `filings.files`, e.g. `CIK0001067983-submissions-001.json`.
    async fn submission_page(&self, name: &str) -> Result<RecentFilings> {
        let url = self.build_url(UrlType::SubmissionPage, &[name]);
        let response = self.get(&url).await?;
        Ok(serde_json::from_str::<RecentFilings>(&response)?)
    }

    /// Retrieves recent filings for a given CIK.
    ///
    /// Rows that cannot be converted (short columns, bad acceptance timestamps)
    /// are skipped.
    async fn get_recent_filings(&self, cik: &str) -> Result<Vec<DetailedFiling>> {
        let submission = self.submissions(cik).await?;
        Ok(submission.filings.recent.detailed())
    }

    /// Retrieves and filters filings for a given company based on specified options.
    ///
    /// * `form_types`: only filings of these types (plus their `/A` amendments
    ///   when `include_amendments` is set) are returned.
    /// * `offset`: skips this many filings from the start of the list.
    /// * `limit`: returns at most this many filings.
    async fn filings(&self, cik: &str, opts: Option<FilingOptions>) -> Result<Vec<DetailedFiling>> {
        let mut all_filings = self.get_recent_filings(cik).await?;

        if let Some(opts) = opts {
            all_filings.retain(|filing| opts.matches_form(&filing.form));

            if let Some(offset) = opts.offset {
                all_filings = all_filings.into_iter().skip(offset).collect();
            }

            if let Some(limit) = opts.limit {
                all_filings.truncate(limit);
            }
        }

        Ok(all_filings)
    }

    /// Retrieves the filing directory (`index.json`) for a specific filing.
    async fn filing_directory(
        &self,
        cik: &str,
        accession_number: &str,
    ) -> Result<DirectoryResponse> {
        let url = self.build_url(UrlType::FilingDirectory, &[cik, accession_number]);
        let response = self.get(&url).await?;
        Ok(serde_json::from_str::<DirectoryResponse>(&response)?)
    }
}

#[async_trait]
impl HoldingsSource for Edgar {
    /// Indexes the recent block of the filer's submissions and every older
    /// page it lists. Busy filers push 13F reports out of the recent block
    /// quickly, so older periods are often only on those pages.
    async fn holdings_index(&self, cik: &Cik) -> Result<Vec<FilingIndexEntry>> {
        let submission = self.submissions(cik.as_str()).await?;

        let mut pages = vec![submission.filings.recent.clone()];
        for name in submission.page_names() {
            tracing::debug!("Fetching submission page {} of {}", name, cik);
            pages.push(self.submission_page(name).await?);
        }

        let entries = holdings_entries(cik, &pages);
        tracing::debug!(
            "{} has {} 13F filings across {} pages",
            cik,
            entries.len(),
            pages.len()
        );
        Ok(entries)
    }

    async fn resolve_documents(&self, entry: &FilingIndexEntry) -> Result<DocumentSet> {
        let cik = entry.location.cik.unpadded();
        let accession_number = entry.accession_number();

        let directory = self.filing_directory(cik, accession_number).await?;
        let (primary, holdings) = directory.holdings_documents()?;

        Ok(DocumentSet {
            primary: self.build_url(
                UrlType::FilingContent,
                &[cik, accession_number, &primary.name],
            ),
            holdings: self.build_url(
                UrlType::FilingContent,
                &[cik, accession_number, &holdings.name],
            ),
            rendered: self.build_url(UrlType::RenderedDocument, &[cik, accession_number]),
        })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        self.get(url).await
    }
}
