//! Per-filer cache of reconciled 13F filings.
//!
//! A [`FilingStore`] answers "latest filing" and "filing for period X" for one
//! CIK. The first request for a period fetches the original, folds in its
//! amendments and caches the result; later requests are served from memory.
//!
//! Each period has its own `OnceCell`. Concurrent requests for an unresolved
//! period wait on the same resolution, and a failed resolution leaves the cell
//! empty so the next request starts over.
//!
//! A cell remembers which original and which candidate amendments it was
//! resolved from. When a refreshed index names a different original for the
//! period, or new amendments were filed since, the cell is replaced and the
//! period is resolved again. The previous record stays visible in
//! [`FilingStore::snapshot`] until its replacement is ready.
//!
//! # Example
//!
//! ```ignore
//! use edgar13f::{Edgar, FilingStore, ReportingPeriod, TableDetail};
//!
//! let edgar = Edgar::new("YourAppName contact@example.com")?;
//! let store = FilingStore::new(edgar, "0001067983")?;
//!
//! let latest = store.latest().await?;
//! println!("{} holds {} positions", latest.cover_page().manager_name, latest.holdings().len());
//!
//! let q2: ReportingPeriod = "Q2-2022".parse()?;
//! let filing = store.for_period(q2).await?;
//! let table = filing.to_table(TableDetail::Detailed);
//! ```

use crate::amendments::{DeclaredPeriods, Reconciler};
use crate::config::StoreConfig;
use crate::error::{EdgarError, Result};
use crate::holdings::{CoverPage, HoldingsTable, ResolvedFiling, TableDetail};
use crate::index::{Cik, FilingIndex, FilingIndexEntry};
use crate::parsing::thirteenf::ThirteenFParser;
use crate::period::ReportingPeriod;
use crate::traits::HoldingsSource;
use futures_util::future::try_join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};
use tokio::sync::{Mutex, OnceCell};

/// Index filings a period was resolved from: the original and every
/// amendment filed on or after it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Sources {
    original: String,
    amendments: Vec<String>,
}

impl Sources {
    fn new(index: &FilingIndex, original: &FilingIndexEntry) -> Self {
        Self {
            original: original.accession_number().to_string(),
            amendments: index
                .amendments_since(original.filing_date)
                .into_iter()
                .map(|entry| entry.accession_number().to_string())
                .collect(),
        }
    }
}

struct FilingSlot {
    sources: Sources,
    cell: Arc<OnceCell<Arc<ResolvedFiling>>>,
    previous: Option<Arc<ResolvedFiling>>,
}

impl FilingSlot {
    fn new(sources: Sources) -> Self {
        Self {
            sources,
            cell: Arc::new(OnceCell::new()),
            previous: None,
        }
    }

    /// The resolved record, or the one it is about to replace.
    fn current(&self) -> Option<&Arc<ResolvedFiling>> {
        self.cell.get().or(self.previous.as_ref())
    }

    fn replace(&mut self, sources: Sources) {
        let previous = self.current().cloned();
        *self = Self::new(sources);
        self.previous = previous;
    }
}

pub struct FilingStore<S> {
    source: S,
    cik: Cik,
    config: StoreConfig,
    parser: ThirteenFParser,
    index: Mutex<Option<Arc<FilingIndex>>>,
    filings: Mutex<HashMap<ReportingPeriod, FilingSlot>>,
    declared_periods: DeclaredPeriods,
    latest_period: Mutex<Option<ReportingPeriod>>,
    manager_name: OnceLock<String>,
}

impl<S: HoldingsSource> FilingStore<S> {
    /// Creates a store for `cik` with the default [`StoreConfig`].
    ///
    /// # Errors
    ///
    /// `EdgarError::InvalidIdentifier` if `cik` is not a 10 digit string.
    /// Nothing is fetched until the first query.
    pub fn new(source: S, cik: &str) -> Result<Self> {
        Self::with_config(source, cik, StoreConfig::default())
    }

    pub fn with_config(source: S, cik: &str, config: StoreConfig) -> Result<Self> {
        let cik = Cik::parse(cik)?;
        let parser = ThirteenFParser::new(config.unit_cutover_year);

        Ok(Self {
            source,
            cik,
            config,
            parser,
            index: Mutex::new(None),
            filings: Mutex::new(HashMap::new()),
            declared_periods: Mutex::new(HashMap::new()),
            latest_period: Mutex::new(None),
            manager_name: OnceLock::new(),
        })
    }

    pub fn cik(&self) -> &Cik {
        &self.cik
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The filer's 13F index, fetched on first use.
    pub async fn index(&self) -> Result<Arc<FilingIndex>> {
        let mut slot = self.index.lock().await;
        if let Some(index) = slot.as_ref() {
            return Ok(Arc::clone(index));
        }

        let index = Arc::new(self.fetch_index().await?);
        *slot = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Re-fetches the filing index so [`latest`](Self::latest) can see newer
    /// filings.
    ///
    /// Resolved periods whose original or candidate amendments changed are
    /// resolved again before this returns; the others stay cached. If one of
    /// those resolutions fails, the error is returned and the period keeps
    /// its previous record until a later request succeeds.
    pub async fn refresh_index(&self) -> Result<Arc<FilingIndex>> {
        let index = Arc::new(self.fetch_index().await?);
        *self.index.lock().await = Some(Arc::clone(&index));
        *self.latest_period.lock().await = None;

        let stale: Vec<ReportingPeriod> = self
            .filings
            .lock()
            .await
            .iter()
            .filter(|(period, slot)| {
                slot.current().is_some()
                    && index
                        .original_for_period(**period)
                        .is_some_and(|original| Sources::new(&index, original) != slot.sources)
            })
            .map(|(period, _)| *period)
            .collect();
        if !stale.is_empty() {
            tracing::info!(
                "Index for {} changed, resolving {} cached periods again",
                self.cik,
                stale.len()
            );
            self.for_periods(&stale).await?;
        }

        Ok(index)
    }

    async fn fetch_index(&self) -> Result<FilingIndex> {
        let index = FilingIndex::new(self.source.holdings_index(&self.cik).await?);
        tracing::info!(
            "Loaded 13F index for {}: {} originals, {} amendments",
            self.cik,
            index.originals().count(),
            index.amendments().count()
        );
        Ok(index)
    }

    /// The most recently filed original, reconciled with its amendments.
    pub async fn latest(&self) -> Result<Arc<ResolvedFiling>> {
        let index = self.index().await?;
        let period = index
            .latest_original()
            .map(|entry| entry.attributed_period())
            .ok_or_else(|| EdgarError::NoHoldingsReports(self.cik.to_string()))?;

        let filing = self.for_period(period).await?;
        *self.latest_period.lock().await = Some(period);
        Ok(filing)
    }

    /// A holdings table of the latest filing.
    pub async fn latest_table(&self, detail: TableDetail) -> Result<HoldingsTable> {
        Ok(self.latest().await?.to_table(detail))
    }

    pub async fn latest_cover_page(&self) -> Result<CoverPage> {
        Ok(self.latest().await?.cover_page().clone())
    }

    /// Total value of the latest filing in whole dollars.
    pub async fn latest_portfolio_value(&self) -> Result<u64> {
        Ok(self.latest().await?.cover_page().portfolio_value)
    }

    pub async fn latest_holding_count(&self) -> Result<u64> {
        Ok(self.latest().await?.cover_page().holding_count)
    }

    /// The reconciled filing for `period`.
    ///
    /// # Errors
    ///
    /// `EdgarError::PeriodNotFound` if no original 13F-HR is attributed to
    /// `period`. Retrieval and parse errors of the original or of any
    /// amendment targeting `period` are returned as is; the cache keeps
    /// whatever record it held for `period` before the call.
    pub async fn for_period(&self, period: ReportingPeriod) -> Result<Arc<ResolvedFiling>> {
        let index = self.index().await?;
        let original = index
            .original_for_period(period)
            .ok_or(EdgarError::PeriodNotFound(period))?;
        let sources = Sources::new(&index, original);

        let cell = {
            let mut filings = self.filings.lock().await;
            let slot = filings
                .entry(period)
                .or_insert_with(|| FilingSlot::new(sources.clone()));
            if slot.sources != sources {
                tracing::debug!("Sources of {} changed since it was resolved", period);
                slot.replace(sources);
            }
            Arc::clone(&slot.cell)
        };

        let filing = cell
            .get_or_try_init(|| self.resolve(&index, original, period))
            .await?;
        Ok(Arc::clone(filing))
    }

    /// Resolves several periods concurrently. Fails if any of them fails.
    pub async fn for_periods(
        &self,
        periods: &[ReportingPeriod],
    ) -> Result<Vec<Arc<ResolvedFiling>>> {
        try_join_all(periods.iter().map(|period| self.for_period(*period))).await
    }

    async fn resolve(
        &self,
        index: &FilingIndex,
        original: &FilingIndexEntry,
        period: ReportingPeriod,
    ) -> Result<Arc<ResolvedFiling>> {
        tracing::info!(
            "Resolving {} for {} from {}",
            period,
            self.cik,
            original.accession_number()
        );

        let reconciler = Reconciler {
            source: &self.source,
            parser: &self.parser,
            amendment_delay: self.config.amendment_delay,
            declared_periods: &self.declared_periods,
        };
        let filing = reconciler.reconcile(index, original, period).await?;

        let _ = self
            .manager_name
            .set(filing.cover_page().manager_name.clone());
        if index
            .latest_original()
            .is_some_and(|latest| latest.accession_number() == original.accession_number())
        {
            *self.latest_period.lock().await = Some(period);
        }

        tracing::debug!(
            "Resolved {} (amended: {}, {} lines)",
            period,
            filing.is_amended(),
            filing.holdings().len()
        );
        Ok(Arc::new(filing))
    }

    /// Name of the filing manager, once any filing has been resolved.
    pub fn manager_name(&self) -> Option<&str> {
        self.manager_name.get().map(String::as_str)
    }

    /// Period of the most recently filed original, once it has been resolved.
    pub async fn latest_period(&self) -> Option<ReportingPeriod> {
        *self.latest_period.lock().await
    }

    pub async fn is_resolved(&self, period: ReportingPeriod) -> bool {
        self.filings
            .lock()
            .await
            .get(&period)
            .is_some_and(|slot| slot.current().is_some())
    }

    /// Every resolved period, in chronological order.
    pub async fn snapshot(&self) -> BTreeMap<ReportingPeriod, Arc<ResolvedFiling>> {
        self.filings
            .lock()
            .await
            .iter()
            .filter_map(|(period, slot)| {
                slot.current().map(|filing| (*period, Arc::clone(filing)))
            })
            .collect()
    }
}
