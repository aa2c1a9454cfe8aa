#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use edgar13f::{
    Cik, DocumentLocation, DocumentSet, EdgarError, FilingIndexEntry, FilingKind, HoldingsSource,
    Result,
};
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

pub const CIK: &str = "0001067983";

pub fn fixture_path(relative: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn read_fixture(relative: impl AsRef<Path>) -> String {
    fs::read_to_string(fixture_path(relative)).expect("fixture file should be readable")
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

pub fn edgar() -> edgar13f::Edgar {
    edgar13f::Edgar::new("test_agent example@example.com").unwrap()
}

/// In-memory `HoldingsSource` serving 13F fixtures and counting every fetch.
#[derive(Default)]
pub struct FakeSource {
    entries: Mutex<Vec<FilingIndexEntry>>,
    documents: Mutex<HashMap<String, String>>,
    latency: Option<Duration>,
    index_fetches: Mutex<usize>,
    fetches: Mutex<Vec<String>>,
    fail_next: Mutex<HashSet<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filing whose primary and information table documents are fixture files
    /// under `tests/fixtures/13f/`.
    pub fn with_filing(
        self,
        filing_date: &str,
        kind: FilingKind,
        accession_number: &str,
        primary_fixture: &str,
        holdings_fixture: &str,
    ) -> Self {
        self.add_filing(
            filing_date,
            kind,
            accession_number,
            primary_fixture,
            holdings_fixture,
        );
        self
    }

    /// Same as [`with_filing`](Self::with_filing), for a source a store already owns.
    pub fn add_filing(
        &self,
        filing_date: &str,
        kind: FilingKind,
        accession_number: &str,
        primary_fixture: &str,
        holdings_fixture: &str,
    ) {
        self.entries.lock().unwrap().push(FilingIndexEntry {
            filing_date: date(filing_date),
            kind,
            location: DocumentLocation {
                cik: Cik::parse(CIK).unwrap(),
                accession_number: accession_number.to_string(),
            },
        });
        let urls = Self::urls(accession_number);
        let mut documents = self.documents.lock().unwrap();
        documents.insert(urls.primary, read_fixture(format!("13f/{}", primary_fixture)));
        documents.insert(urls.holdings, read_fixture(format!("13f/{}", holdings_fixture)));
    }

    pub fn with_rendered(self, accession_number: &str, rendered_fixture: &str) -> Self {
        self.documents.lock().unwrap().insert(
            Self::urls(accession_number).rendered,
            read_fixture(format!("13f/{}", rendered_fixture)),
        );
        self
    }

    /// Delays every fetch, so concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next fetch of `url` fail with a retrieval error.
    pub fn fail_next_fetch(&self, url: &str) {
        self.fail_next.lock().unwrap().insert(url.to_string());
    }

    pub fn urls(accession_number: &str) -> DocumentSet {
        DocumentSet {
            primary: format!("mem://{}/primary_doc.xml", accession_number),
            holdings: format!("mem://{}/infotable.xml", accession_number),
            rendered: format!("mem://{}/xslForm13F_X02/primary_doc.xml", accession_number),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn fetches_of(&self, url: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|fetched| fetched.as_str() == url)
            .count()
    }

    pub fn index_fetches(&self) -> usize {
        *self.index_fetches.lock().unwrap()
    }
}

#[async_trait]
impl HoldingsSource for FakeSource {
    async fn holdings_index(&self, _cik: &Cik) -> Result<Vec<FilingIndexEntry>> {
        *self.index_fetches.lock().unwrap() += 1;
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn resolve_documents(&self, entry: &FilingIndexEntry) -> Result<DocumentSet> {
        Ok(Self::urls(entry.accession_number()))
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.fetches.lock().unwrap().push(url.to_string());
        if self.fail_next.lock().unwrap().remove(url) {
            return Err(EdgarError::RateLimitExceeded);
        }
        self.documents
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(EdgarError::NotFound)
    }
}
