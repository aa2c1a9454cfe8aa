//! Form 13F XML parser.
//!
//! A 13F filing carries two structured documents:
//!
//! - the **primary document** (`edgarSubmission`), holding the header, cover
//!   page, signature block and summary page;
//! - the **information table** (`informationTable`), one `infoTable` element
//!   per reported position.
//!
//! Both are deserialized with `quick_xml`'s serde support into loose `Raw*`
//! structs where every leaf is optional, then normalized into [`CoverPage`] and
//! [`HoldingLine`]. Missing text leaves become [`NOT_AVAILABLE`](crate::holdings::NOT_AVAILABLE).
//! Missing structural parts (the cover page itself, the summary totals, the
//! period of report, a holding's value or amounts) make the whole document
//! `EdgarError::MalformedDocument`.
//!
//! # Example
//!
//! ```ignore
//! use edgar13f::parsing::thirteenf::{FilingDocuments, ThirteenFParser};
//!
//! let parser = ThirteenFParser::default();
//! let documents = FilingDocuments {
//!     primary: primary_xml,
//!     holdings: info_table_xml,
//!     rendered: None,
//! };
//! let filing = parser.parse(&documents, filing_date)?;
//! println!("{} positions", filing.holdings().len());
//! ```

use super::units::UnitMultiplier;
use super::utils::{non_empty, parse_form_date, required_u64, text_or_na};
use crate::config::UNIT_CUTOVER_YEAR;
use crate::error::{EdgarError, Result};
use crate::holdings::{
    AmendmentType, AmountType, CoverPage, HoldingLine, ResolvedFiling, SignatureBlock,
};
use chrono::{Datelike, NaiveDate};
use quick_xml::Reader;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use serde::Deserialize;

const PRIMARY: &str = "primary";
const HOLDINGS: &str = "information table";
const PRIMARY_ROOT: &str = "edgarSubmission";
const HOLDINGS_ROOT: &str = "informationTable";

/// The documents of one filing, already fetched.
#[derive(Debug, Clone, Default)]
pub struct FilingDocuments {
    /// Primary XML document (cover page, signature, summary).
    pub primary: String,
    /// Information table XML document.
    pub holdings: String,
    /// Rendered (HTML) primary document. Only needed in the unit cutover year.
    pub rendered: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubmission {
    header_data: Option<RawHeaderData>,
    form_data: Option<RawFormData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHeaderData {
    submission_type: Option<String>,
    filer_info: Option<RawFilerInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFilerInfo {
    period_of_report: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFormData {
    cover_page: Option<RawCoverPage>,
    signature_block: Option<RawSignatureBlock>,
    summary_page: Option<RawSummaryPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoverPage {
    report_calendar_or_quarter: Option<String>,
    is_amendment: Option<String>,
    amendment_no: Option<String>,
    amendment_info: Option<RawAmendmentInfo>,
    filing_manager: Option<RawFilingManager>,
    report_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAmendmentInfo {
    amendment_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFilingManager {
    name: Option<String>,
    address: Option<RawAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAddress {
    street1: Option<String>,
    city: Option<String>,
    state_or_country: Option<String>,
    zip_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSignatureBlock {
    name: Option<String>,
    title: Option<String>,
    phone: Option<String>,
    city: Option<String>,
    state_or_country: Option<String>,
    signature_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummaryPage {
    table_entry_total: Option<String>,
    table_value_total: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInformationTable {
    #[serde(rename = "infoTable", default)]
    info_tables: Vec<RawInfoTable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInfoTable {
    name_of_issuer: Option<String>,
    title_of_class: Option<String>,
    cusip: Option<String>,
    value: Option<String>,
    shrs_or_prn_amt: Option<RawSharesOrPrincipal>,
    put_call: Option<String>,
    investment_discretion: Option<String>,
    other_manager: Option<String>,
    voting_authority: Option<RawVotingAuthority>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSharesOrPrincipal {
    ssh_prnamt: Option<String>,
    ssh_prnamt_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVotingAuthority {
    #[serde(rename = "Sole")]
    sole: Option<String>,
    #[serde(rename = "Shared")]
    shared: Option<String>,
    #[serde(rename = "None")]
    none: Option<String>,
}

/// Parser for 13F filings with a configurable unit cutover year.
#[derive(Debug, Clone)]
pub struct ThirteenFParser {
    cutover_year: i32,
}

impl Default for ThirteenFParser {
    fn default() -> Self {
        Self::new(UNIT_CUTOVER_YEAR)
    }
}

impl ThirteenFParser {
    pub fn new(cutover_year: i32) -> Self {
        Self { cutover_year }
    }

    pub fn cutover_year(&self) -> i32 {
        self.cutover_year
    }

    /// Parses a filing's documents into a [`ResolvedFiling`].
    ///
    /// `filing_date` is the date from the filing index; it selects the unit
    /// convention, which is then applied to the portfolio total and to every
    /// holding value alike.
    pub fn parse(
        &self,
        documents: &FilingDocuments,
        filing_date: NaiveDate,
    ) -> Result<ResolvedFiling> {
        let multiplier = UnitMultiplier::for_filing(
            filing_date.year(),
            self.cutover_year,
            documents.rendered.as_deref(),
        );

        let cover_page = self.parse_cover_page(&documents.primary, multiplier)?;
        let holdings = self.parse_holdings(&documents.holdings, multiplier)?;

        if cover_page.holding_count != holdings.len() as u64 {
            tracing::warn!(
                "{} declares {} holdings but its information table lists {}",
                cover_page.manager_name,
                cover_page.holding_count,
                holdings.len()
            );
        }
        tracing::debug!(
            "Parsed 13F for {} ({} lines, x{})",
            cover_page.period_of_report,
            holdings.len(),
            multiplier.factor()
        );

        Ok(ResolvedFiling::new(cover_page, holdings))
    }

    /// Parses the primary document's cover page, signature block and summary page.
    pub fn parse_cover_page(&self, primary: &str, multiplier: UnitMultiplier) -> Result<CoverPage> {
        expect_root(primary, PRIMARY_ROOT, PRIMARY)?;
        let raw: RawSubmission = from_str(primary)?;

        let period_of_report = period_of_report(&raw)?;
        let header = raw.header_data;
        let form = raw
            .form_data
            .ok_or_else(|| EdgarError::malformed(PRIMARY, "formData"))?;
        let cover = form
            .cover_page
            .ok_or_else(|| EdgarError::malformed(PRIMARY, "formData/coverPage"))?;
        let summary = form
            .summary_page
            .ok_or_else(|| EdgarError::malformed(PRIMARY, "formData/summaryPage"))?;

        let raw_value = required_u64(
            summary.table_value_total.as_deref(),
            PRIMARY,
            "summaryPage/tableValueTotal",
        )?;
        let portfolio_value = multiplier
            .apply(raw_value)
            .ok_or_else(|| EdgarError::malformed(PRIMARY, "tableValueTotal within range"))?;
        let holding_count = required_u64(
            summary.table_entry_total.as_deref(),
            PRIMARY,
            "summaryPage/tableEntryTotal",
        )?;

        let submission_type = text_or_na(
            header
                .as_ref()
                .and_then(|h| h.submission_type.as_deref()),
        );
        let is_amendment = cover
            .is_amendment
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
            || submission_type.ends_with("/A");
        let amendment_type = if is_amendment {
            AmendmentType::from_declared(
                cover
                    .amendment_info
                    .as_ref()
                    .and_then(|info| info.amendment_type.as_deref()),
            )
        } else {
            AmendmentType::NotApplicable
        };
        let amendment_number = cover
            .amendment_no
            .as_deref()
            .and_then(|n| n.trim().parse::<u32>().ok());

        let manager = cover.filing_manager.as_ref();
        let address = manager.and_then(|m| m.address.as_ref());
        let business_address = [
            address.and_then(|a| a.street1.as_deref()),
            address.and_then(|a| a.city.as_deref()),
            address.and_then(|a| a.state_or_country.as_deref()),
            address.and_then(|a| a.zip_code.as_deref()),
        ]
        .into_iter()
        .map(text_or_na)
        .collect::<Vec<_>>()
        .join(", ");

        let signature = form.signature_block.as_ref();
        let signature = SignatureBlock {
            name: text_or_na(signature.and_then(|s| s.name.as_deref())),
            title: text_or_na(signature.and_then(|s| s.title.as_deref())),
            phone: text_or_na(signature.and_then(|s| s.phone.as_deref())),
            city: text_or_na(signature.and_then(|s| s.city.as_deref())),
            state_or_country: text_or_na(signature.and_then(|s| s.state_or_country.as_deref())),
            date: text_or_na(signature.and_then(|s| s.signature_date.as_deref())),
        };

        Ok(CoverPage {
            manager_name: text_or_na(manager.and_then(|m| m.name.as_deref())),
            business_address,
            submission_type,
            report_type: text_or_na(cover.report_type.as_deref()),
            period_of_report,
            amendment_number,
            amendment_type,
            signature,
            portfolio_value,
            holding_count,
            unit_multiplier: multiplier,
            amended: false,
        })
    }

    /// Parses every `infoTable` of an information table document.
    pub fn parse_holdings(
        &self,
        holdings: &str,
        multiplier: UnitMultiplier,
    ) -> Result<Vec<HoldingLine>> {
        expect_root(holdings, HOLDINGS_ROOT, HOLDINGS)?;
        let raw: RawInformationTable = from_str(holdings)?;

        raw.info_tables
            .into_iter()
            .enumerate()
            .map(|(idx, row)| holding_line(idx, row, multiplier))
            .collect()
    }
}

/// Reads only the declared period of report of a primary document.
///
/// Cheaper than a full parse, and enough to tell which period an amendment targets.
pub fn declared_period_of_report(primary: &str) -> Result<NaiveDate> {
    expect_root(primary, PRIMARY_ROOT, PRIMARY)?;
    let raw: RawSubmission = from_str(primary)?;
    period_of_report(&raw)
}

/// `headerData/filerInfo/periodOfReport`, falling back to the cover page's
/// `reportCalendarOrQuarter`.
fn period_of_report(raw: &RawSubmission) -> Result<NaiveDate> {
    let from_header = raw
        .header_data
        .as_ref()
        .and_then(|h| h.filer_info.as_ref())
        .and_then(|f| non_empty(f.period_of_report.as_deref()));
    let from_cover = raw
        .form_data
        .as_ref()
        .and_then(|f| f.cover_page.as_ref())
        .and_then(|c| non_empty(c.report_calendar_or_quarter.as_deref()));

    let value = from_header
        .or(from_cover)
        .ok_or_else(|| EdgarError::malformed(PRIMARY, "periodOfReport"))?;
    parse_form_date(&value).map_err(|_| {
        EdgarError::malformed(PRIMARY, format!("periodOfReport (unparseable {:?})", value))
    })
}

fn holding_line(idx: usize, row: RawInfoTable, multiplier: UnitMultiplier) -> Result<HoldingLine> {
    let anchor = |field: &str| format!("infoTable[{}]/{}", idx, field);

    let raw_value = required_u64(row.value.as_deref(), HOLDINGS, &anchor("value"))?;
    let value = multiplier
        .apply(raw_value)
        .ok_or_else(|| EdgarError::malformed(HOLDINGS, anchor("value within range")))?;

    let shares = row
        .shrs_or_prn_amt
        .as_ref()
        .ok_or_else(|| EdgarError::malformed(HOLDINGS, anchor("shrsOrPrnAmt")))?;
    let amount = required_u64(
        shares.ssh_prnamt.as_deref(),
        HOLDINGS,
        &anchor("shrsOrPrnAmt/sshPrnamt"),
    )?;
    let amount_type = shares
        .ssh_prnamt_type
        .as_deref()
        .and_then(AmountType::from_code)
        .ok_or_else(|| EdgarError::malformed(HOLDINGS, anchor("shrsOrPrnAmt/sshPrnamtType")))?;

    let voting = row
        .voting_authority
        .as_ref()
        .ok_or_else(|| EdgarError::malformed(HOLDINGS, anchor("votingAuthority")))?;

    Ok(HoldingLine {
        issuer: text_or_na(row.name_of_issuer.as_deref()),
        class_title: text_or_na(row.title_of_class.as_deref()),
        cusip: text_or_na(row.cusip.as_deref()),
        value,
        amount_type,
        amount,
        put_call: non_empty(row.put_call.as_deref()),
        investment_discretion: text_or_na(row.investment_discretion.as_deref()),
        other_manager: text_or_na(row.other_manager.as_deref()),
        voting_sole: required_u64(
            voting.sole.as_deref(),
            HOLDINGS,
            &anchor("votingAuthority/Sole"),
        )?,
        voting_shared: required_u64(
            voting.shared.as_deref(),
            HOLDINGS,
            &anchor("votingAuthority/Shared"),
        )?,
        voting_none: required_u64(
            voting.none.as_deref(),
            HOLDINGS,
            &anchor("votingAuthority/None"),
        )?,
    })
}

/// Checks that the document's root element has the expected local name.
///
/// The serde deserializer ignores the root name, so without this an HTML error
/// page or the wrong XML document would parse as an empty filing.
fn expect_root(xml: &str, expected: &str, document: &'static str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.local_name();
                return if name.as_ref() == expected.as_bytes() {
                    Ok(())
                } else {
                    Err(EdgarError::malformed(
                        document,
                        format!(
                            "{} root element (found {})",
                            expected,
                            String::from_utf8_lossy(name.as_ref())
                        ),
                    ))
                };
            }
            Ok(Event::Eof) => {
                return Err(EdgarError::malformed(document, format!("{} root element", expected)));
            }
            Ok(_) => continue,
            Err(e) => return Err(EdgarError::XmlError(e.to_string())),
        }
    }
}
