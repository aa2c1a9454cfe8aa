//! Amendment classification and merging.
//!
//! An original 13F-HR can be followed by any number of 13F-HR/A filings. Only
//! the filing date of an amendment is in the index; which period it amends is
//! declared inside its primary document, so every candidate amendment has to be
//! opened once to find out. The answer is memoized per store.
//!
//! Amendments are folded into the original in filing order:
//!
//! - a `NEW HOLDINGS` amendment adds positions: its lines are appended and its
//!   totals added to the running totals;
//! - any other amendment restates the filing: it replaces the running record.

use crate::error::{EdgarError, Result};
use crate::filings::DocumentSet;
use crate::holdings::{AmendmentType, ResolvedFiling};
use crate::index::{FilingIndex, FilingIndexEntry};
use crate::parsing::thirteenf::{FilingDocuments, ThirteenFParser, declared_period_of_report};
use crate::parsing::units::UnitMultiplier;
use crate::period::ReportingPeriod;
use crate::traits::HoldingsSource;
use chrono::Datelike;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Target period of each amendment opened so far, by accession number.
/// `None` marks an amendment whose declared period maps to no quarter.
pub(crate) type DeclaredPeriods = Mutex<HashMap<String, Option<ReportingPeriod>>>;

/// Folds one amendment into the running record.
pub fn apply_amendment(running: &mut ResolvedFiling, amendment: ResolvedFiling) {
    let amendment_type = amendment.cover_page().amendment_type;
    match amendment_type {
        AmendmentType::NewHoldings => {
            tracing::info!(
                "Adding {} new holdings worth {} to {}",
                amendment.holdings().len(),
                amendment.cover_page().portfolio_value,
                running.cover_page().period_of_report
            );
            running.absorb_new_holdings(amendment);
        }
        _ => {
            if amendment_type != AmendmentType::Restatement {
                tracing::warn!(
                    "Amendment type {:?} treated as a restatement",
                    amendment_type
                );
            }
            tracing::info!(
                "Replacing filing for {} with restated filing",
                running.cover_page().period_of_report
            );
            *running = amendment;
            running.mark_amended();
        }
    }
}

/// Resolves one period: loads the original, then folds in the amendments that target it.
pub(crate) struct Reconciler<'a, S: ?Sized> {
    pub(crate) source: &'a S,
    pub(crate) parser: &'a ThirteenFParser,
    pub(crate) amendment_delay: Duration,
    pub(crate) declared_periods: &'a DeclaredPeriods,
}

impl<S: HoldingsSource + ?Sized> Reconciler<'_, S> {
    pub(crate) async fn reconcile(
        &self,
        index: &FilingIndex,
        original: &FilingIndexEntry,
        period: ReportingPeriod,
    ) -> Result<ResolvedFiling> {
        let documents = self.source.resolve_documents(original).await?;
        let mut filing = self.load(original, &documents, None).await?;

        for candidate in index.amendments_since(original.filing_date) {
            if let Some(amendment) = self.amendment_for(candidate, period).await? {
                apply_amendment(&mut filing, amendment);
            }
        }

        Ok(filing)
    }

    /// Opens an amendment if it targets `period`. Already-known targets are
    /// answered from the memo without any fetch.
    async fn amendment_for(
        &self,
        entry: &FilingIndexEntry,
        period: ReportingPeriod,
    ) -> Result<Option<ResolvedFiling>> {
        let accession_number = entry.accession_number();
        let known = self
            .declared_periods
            .lock()
            .await
            .get(accession_number)
            .copied();
        if matches!(known, Some(target) if target != Some(period)) {
            return Ok(None);
        }

        if !self.amendment_delay.is_zero() {
            tokio::time::sleep(self.amendment_delay).await;
        }
        let documents = self.source.resolve_documents(entry).await?;
        let primary = self.source.fetch(&documents.primary).await?;

        let target = match known {
            Some(target) => target,
            None => {
                let declared = declared_period_of_report(&primary)?;
                let target = match ReportingPeriod::from_period_of_report(declared) {
                    Ok(target) => Some(target),
                    Err(err) => {
                        tracing::warn!(
                            "Amendment {} declares period {}: {}",
                            accession_number,
                            declared,
                            err
                        );
                        None
                    }
                };
                self.declared_periods
                    .lock()
                    .await
                    .insert(accession_number.to_string(), target);
                target
            }
        };

        if target != Some(period) {
            tracing::debug!("Amendment {} does not amend {}", accession_number, period);
            return Ok(None);
        }

        tracing::debug!("Amendment {} amends {}", accession_number, period);
        self.load(entry, &documents, Some(primary)).await.map(Some)
    }

    /// Fetches and parses a filing's documents. The rendered document is only
    /// fetched when the filing year needs a unit declaration.
    async fn load(
        &self,
        entry: &FilingIndexEntry,
        documents: &DocumentSet,
        primary: Option<String>,
    ) -> Result<ResolvedFiling> {
        let primary = match primary {
            Some(primary) => primary,
            None => self.source.fetch(&documents.primary).await?,
        };
        let holdings = self.source.fetch(&documents.holdings).await?;

        let rendered = if UnitMultiplier::requires_declaration(
            entry.filing_date.year(),
            self.parser.cutover_year(),
        ) {
            match self.source.fetch(&documents.rendered).await {
                Ok(rendered) => Some(rendered),
                Err(EdgarError::NotFound) => {
                    tracing::warn!("No rendered document for {}", entry.accession_number());
                    None
                }
                Err(err) => return Err(err),
            }
        } else {
            None
        };

        self.parser.parse(
            &FilingDocuments {
                primary,
                holdings,
                rendered,
            },
            entry.filing_date,
        )
    }
}
