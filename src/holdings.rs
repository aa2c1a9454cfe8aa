//! Normalized 13F records.
//!
//! A parsed filing is a [`CoverPage`] plus its [`HoldingLine`]s. The
//! [`SimplifiedHolding`] table is derived from the lines and is only ever
//! rebuilt from them, never edited on its own; [`ResolvedFiling`] keeps the
//! three together and is what the store caches per period.

use crate::error::Result;
use crate::parsing::units::UnitMultiplier;
use crate::period::ReportingPeriod;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Stand-in for a text field the filing does not carry.
pub const NOT_AVAILABLE: &str = "N/A";

/// How an amendment relates to the filing it amends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AmendmentType {
    /// The filing is an original report, not an amendment.
    NotApplicable,
    /// An amendment that does not state its type.
    Undeclared,
    /// Reports positions left out of the amended filing.
    NewHoldings,
    /// Restates the amended filing in full.
    Restatement,
}

impl AmendmentType {
    /// Reads the `amendmentType` text of an amendment's cover page.
    pub fn from_declared(declared: Option<&str>) -> Self {
        let Some(declared) = declared.map(str::trim).filter(|s| !s.is_empty()) else {
            return AmendmentType::Undeclared;
        };
        match declared.to_ascii_uppercase().as_str() {
            "NEW HOLDINGS" => AmendmentType::NewHoldings,
            "RESTATEMENT" => AmendmentType::Restatement,
            other => {
                tracing::warn!("Unrecognised amendment type {:?}", other);
                AmendmentType::Undeclared
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureBlock {
    pub name: String,
    pub title: String,
    pub phone: String,
    pub city: String,
    pub state_or_country: String,
    pub date: String,
}

/// Administrative and summary data of one 13F filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverPage {
    pub manager_name: String,
    pub business_address: String,
    pub submission_type: String,
    pub report_type: String,
    /// Quarter-end date the filing declares it covers.
    pub period_of_report: NaiveDate,
    pub amendment_number: Option<u32>,
    pub amendment_type: AmendmentType,
    pub signature: SignatureBlock,
    /// Total value of all holdings, in whole dollars.
    pub portfolio_value: u64,
    /// Number of holding lines the filing reports.
    pub holding_count: u64,
    /// Multiplier that was applied to every monetary figure of this filing.
    pub unit_multiplier: UnitMultiplier,
    /// Set once an amendment has been folded into this record.
    pub amended: bool,
}

impl CoverPage {
    /// The period this filing covers, from its declared period of report.
    pub fn reporting_period(&self) -> Result<ReportingPeriod> {
        ReportingPeriod::from_period_of_report(self.period_of_report)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AmountType {
    Shares,
    Principal,
}

impl AmountType {
    /// Parses the `sshPrnamtType` code (`SH` or `PRN`).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "SH" => Some(AmountType::Shares),
            "PRN" => Some(AmountType::Principal),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AmountType::Shares => "SH",
            AmountType::Principal => "PRN",
        }
    }
}

/// One reported position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoldingLine {
    pub issuer: String,
    pub class_title: String,
    pub cusip: String,
    /// Market value in whole dollars.
    pub value: u64,
    pub amount_type: AmountType,
    pub amount: u64,
    pub put_call: Option<String>,
    pub investment_discretion: String,
    pub other_manager: String,
    pub voting_sole: u64,
    pub voting_shared: u64,
    pub voting_none: u64,
}

/// Holding lines summed per security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimplifiedHolding {
    pub issuer: String,
    pub class_title: String,
    pub cusip: String,
    pub amount_type: AmountType,
    pub value: u64,
    pub amount: u64,
}

/// Groups holding lines by issuer, class, CUSIP and amount type, summing value
/// and amount. Groups keep the order in which they first appear.
pub fn simplify(holdings: &[HoldingLine]) -> Vec<SimplifiedHolding> {
    let mut table: Vec<SimplifiedHolding> = Vec::new();
    let mut positions: HashMap<(&str, &str, &str, AmountType), usize> = HashMap::new();

    for line in holdings {
        let key = (
            line.issuer.as_str(),
            line.class_title.as_str(),
            line.cusip.as_str(),
            line.amount_type,
        );
        match positions.get(&key) {
            Some(&idx) => {
                let row = &mut table[idx];
                row.value += line.value;
                row.amount += line.amount;
            }
            None => {
                positions.insert(key, table.len());
                table.push(SimplifiedHolding {
                    issuer: line.issuer.clone(),
                    class_title: line.class_title.clone(),
                    cusip: line.cusip.clone(),
                    amount_type: line.amount_type,
                    value: line.value,
                    amount: line.amount,
                });
            }
        }
    }

    table
}

/// Which holdings table a caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableDetail {
    #[default]
    Simplified,
    Detailed,
}

/// One of a filing's two holdings tables, detached from the filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HoldingsTable {
    Simplified(Vec<SimplifiedHolding>),
    Detailed(Vec<HoldingLine>),
}

impl HoldingsTable {
    pub fn len(&self) -> usize {
        match self {
            HoldingsTable::Simplified(rows) => rows.len(),
            HoldingsTable::Detailed(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A filing's cover page, holding lines, and the simplified table derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFiling {
    cover_page: CoverPage,
    holdings: Vec<HoldingLine>,
    simplified: Vec<SimplifiedHolding>,
}

impl ResolvedFiling {
    pub fn new(cover_page: CoverPage, holdings: Vec<HoldingLine>) -> Self {
        let simplified = simplify(&holdings);
        Self {
            cover_page,
            holdings,
            simplified,
        }
    }

    pub fn cover_page(&self) -> &CoverPage {
        &self.cover_page
    }

    pub fn holdings(&self) -> &[HoldingLine] {
        &self.holdings
    }

    pub fn simplified(&self) -> &[SimplifiedHolding] {
        &self.simplified
    }

    /// Copies out the requested table.
    pub fn to_table(&self, detail: TableDetail) -> HoldingsTable {
        match detail {
            TableDetail::Simplified => HoldingsTable::Simplified(self.simplified.clone()),
            TableDetail::Detailed => HoldingsTable::Detailed(self.holdings.clone()),
        }
    }

    pub fn is_amended(&self) -> bool {
        self.cover_page.amended
    }

    /// Folds the lines and totals of a new-holdings amendment into this record.
    pub(crate) fn absorb_new_holdings(&mut self, amendment: ResolvedFiling) {
        let amendment_cover = amendment.cover_page;
        self.cover_page.portfolio_value += amendment_cover.portfolio_value;
        self.cover_page.holding_count += amendment_cover.holding_count;
        self.cover_page.amended = true;
        self.holdings.extend(amendment.holdings);
        self.simplified = simplify(&self.holdings);
    }

    pub(crate) fn mark_amended(&mut self) {
        self.cover_page.amended = true;
    }
}
