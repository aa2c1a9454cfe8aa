mod common;

use common::{CIK, FakeSource, date, read_fixture};
use edgar13f::parsing::thirteenf::{FilingDocuments, ThirteenFParser};
use edgar13f::{
    AmendmentType, CoverPage, EdgarError, ErrorKind, FilingKind, FilingStore, HoldingsTable,
    ReportingPeriod, StoreConfig, TableDetail,
};
use std::sync::Arc;
use std::time::Duration;

const Q1_ORIGINAL: &str = "0000950123-22-005825";
const Q2_ORIGINAL: &str = "0000950123-22-009225";
const Q2_NEW_HOLDINGS: &str = "0000950123-22-010217";
const Q1_RESTATEMENT: &str = "0000950123-22-010555";

fn period(label: &str) -> ReportingPeriod {
    label.parse().unwrap()
}

fn config() -> StoreConfig {
    StoreConfig::new().with_amendment_delay(Duration::ZERO)
}

fn store(source: FakeSource) -> FilingStore<FakeSource> {
    FilingStore::with_config(source, CIK, config()).unwrap()
}

/// Two quarters of originals, a new-holdings amendment for Q2 and a
/// restatement of Q1 filed after both originals.
fn filer() -> FakeSource {
    FakeSource::new()
        .with_filing(
            "2022-05-16",
            FilingKind::Original,
            Q1_ORIGINAL,
            "q1_2022_primary.xml",
            "q1_2022_infotable.xml",
        )
        .with_filing(
            "2022-08-15",
            FilingKind::Original,
            Q2_ORIGINAL,
            "q2_2022_primary.xml",
            "q2_2022_infotable.xml",
        )
        .with_filing(
            "2022-09-01",
            FilingKind::Amendment,
            Q2_NEW_HOLDINGS,
            "q2_2022_new_holdings_primary.xml",
            "q2_2022_new_holdings_infotable.xml",
        )
        .with_filing(
            "2022-09-10",
            FilingKind::Amendment,
            Q1_RESTATEMENT,
            "q1_2022_restatement_primary.xml",
            "q1_2022_infotable.xml",
        )
}

#[tokio::test]
async fn new_holdings_amendment_is_merged() {
    let store = store(filer());

    let filing = store.for_period(period("Q2-2022")).await.unwrap();
    let cover = filing.cover_page();

    assert!(cover.amended);
    assert_eq!(cover.portfolio_value, 1_050_000);
    assert_eq!(cover.holding_count, 4);
    assert_eq!(cover.submission_type, "13F-HR");
    assert_eq!(filing.holdings().len(), 4);

    let simplified = filing.simplified();
    assert_eq!(simplified.len(), 3);
    assert_eq!(simplified[0].issuer, "APPLE INC");
    assert_eq!(simplified[0].value, 850_000);
    assert_eq!(simplified[0].amount, 5_500);
    assert_eq!(simplified[2].issuer, "TAIWAN SEMICONDUCTOR MFG LTD");
    assert_eq!(simplified[2].value, 50_000);
}

#[tokio::test]
async fn restatement_replaces_the_original() {
    let store = store(filer());

    let filing = store.for_period(period("Q1-2022")).await.unwrap();
    let cover = filing.cover_page();

    assert!(cover.amended);
    assert_eq!(cover.amendment_type, AmendmentType::Restatement);
    assert_eq!(cover.submission_type, "13F-HR/A");
    assert_eq!(cover.portfolio_value, 650_000);
}

#[tokio::test]
async fn restated_filing_equals_the_parsed_amendment() {
    let source = FakeSource::new()
        .with_filing(
            "2022-08-15",
            FilingKind::Original,
            Q2_ORIGINAL,
            "q2_2022_primary.xml",
            "q2_2022_infotable.xml",
        )
        .with_filing(
            "2022-10-03",
            FilingKind::Amendment,
            "0000950123-22-011001",
            "q2_2022_restatement_primary.xml",
            "q2_2022_restatement_infotable.xml",
        );
    let store = store(source);

    let resolved = store.for_period(period("Q2-2022")).await.unwrap();

    let expected = ThirteenFParser::default()
        .parse(
            &FilingDocuments {
                primary: read_fixture("13f/q2_2022_restatement_primary.xml"),
                holdings: read_fixture("13f/q2_2022_restatement_infotable.xml"),
                rendered: None,
            },
            date("2022-10-03"),
        )
        .unwrap();
    let expected_cover = CoverPage {
        amended: true,
        ..expected.cover_page().clone()
    };

    assert_eq!(resolved.cover_page(), &expected_cover);
    assert_eq!(resolved.holdings(), expected.holdings());
    assert_eq!(resolved.simplified(), expected.simplified());
}

#[tokio::test]
async fn unamended_filing_passes_through() {
    let source = FakeSource::new().with_filing(
        "2022-08-15",
        FilingKind::Original,
        Q2_ORIGINAL,
        "q2_2022_primary.xml",
        "q2_2022_infotable.xml",
    );
    let store = store(source);

    let filing = store.for_period(period("Q2-2022")).await.unwrap();

    assert!(!filing.is_amended());
    assert_eq!(filing.cover_page().portfolio_value, 1_000_000);
    assert_eq!(filing.cover_page().holding_count, 3);
    assert_eq!(filing.holdings()[2].put_call.as_deref(), Some("Call"));
}

#[tokio::test]
async fn amendment_filed_before_the_original_is_ignored() {
    let source = FakeSource::new()
        .with_filing(
            "2022-08-10",
            FilingKind::Amendment,
            Q2_NEW_HOLDINGS,
            "q2_2022_new_holdings_primary.xml",
            "q2_2022_new_holdings_infotable.xml",
        )
        .with_filing(
            "2022-08-15",
            FilingKind::Original,
            Q2_ORIGINAL,
            "q2_2022_primary.xml",
            "q2_2022_infotable.xml",
        );
    let store = store(source);

    let filing = store.for_period(period("Q2-2022")).await.unwrap();

    assert!(!filing.is_amended());
    assert_eq!(filing.cover_page().portfolio_value, 1_000_000);
    let urls = FakeSource::urls(Q2_NEW_HOLDINGS);
    assert_eq!(store.source().fetches_of(&urls.primary), 0);
}

#[tokio::test]
async fn amendment_targets_are_opened_once() {
    let store = store(filer());

    store.for_period(period("Q2-2022")).await.unwrap();
    store.for_period(period("Q1-2022")).await.unwrap();

    // Q2 resolution already learned that this amendment targets Q2
    let new_holdings = FakeSource::urls(Q2_NEW_HOLDINGS);
    assert_eq!(store.source().fetches_of(&new_holdings.primary), 1);
    assert_eq!(store.source().fetches_of(&new_holdings.holdings), 1);
}

#[tokio::test]
async fn rendered_document_is_not_fetched_outside_cutover_year() {
    let store = store(filer());

    store.for_period(period("Q2-2022")).await.unwrap();

    for accession_number in [Q2_ORIGINAL, Q2_NEW_HOLDINGS] {
        let urls = FakeSource::urls(accession_number);
        assert_eq!(store.source().fetches_of(&urls.rendered), 0);
    }
}

#[tokio::test]
async fn cutover_year_reads_rendered_declaration() {
    let accession_number = "0000950123-23-005270";
    let filing = |rendered: Option<&str>| {
        let source = FakeSource::new().with_filing(
            "2023-05-15",
            FilingKind::Original,
            accession_number,
            "q1_2023_primary.xml",
            "q1_2023_infotable.xml",
        );
        match rendered {
            Some(fixture) => source.with_rendered(accession_number, fixture),
            None => source,
        }
    };

    let dollars = store(filing(Some("rendered_nearest_dollar.html")));
    let value = dollars.for_period(period("Q1-2023")).await.unwrap();
    assert_eq!(value.cover_page().portfolio_value, 1_000_000);
    assert_eq!(value.holdings()[0].value, 1_000_000);
    let urls = FakeSource::urls(accession_number);
    assert_eq!(dollars.source().fetches_of(&urls.rendered), 1);

    let thousands = store(filing(Some("rendered_thousands.html")));
    let value = thousands.for_period(period("Q1-2023")).await.unwrap();
    assert_eq!(value.cover_page().portfolio_value, 1_000_000_000);

    let missing = store(filing(None));
    let value = missing.for_period(period("Q1-2023")).await.unwrap();
    assert_eq!(value.cover_page().portfolio_value, 1_000_000_000);
}

#[tokio::test]
async fn latest_resolves_most_recent_original() {
    let store = store(filer());

    let latest = store.latest().await.unwrap();

    assert_eq!(latest.cover_page().period_of_report, date("2022-06-30"));
    assert_eq!(store.latest_period().await, Some(period("Q2-2022")));
    assert_eq!(store.manager_name(), Some("Example Capital LLC"));
    assert_eq!(store.latest_portfolio_value().await.unwrap(), 1_050_000);
    assert_eq!(store.latest_holding_count().await.unwrap(), 4);
    assert_eq!(
        store.latest_cover_page().await.unwrap().business_address,
        "3555 Farnam Street, Omaha, NE, 68131"
    );

    assert_eq!(store.latest_table(TableDetail::default()).await.unwrap().len(), 3);
    assert!(matches!(
        store.latest_table(TableDetail::Detailed).await.unwrap(),
        HoldingsTable::Detailed(rows) if rows.len() == 4
    ));
}

#[tokio::test]
async fn older_period_is_not_marked_latest() {
    let store = store(filer());

    store.for_period(period("Q1-2022")).await.unwrap();
    assert_eq!(store.latest_period().await, None);

    store.for_period(period("Q2-2022")).await.unwrap();
    assert_eq!(store.latest_period().await, Some(period("Q2-2022")));
}

#[tokio::test]
async fn warm_cache_performs_no_fetches() {
    let store = store(filer());

    let first = store.for_period(period("Q2-2022")).await.unwrap();
    let fetches = store.source().fetch_count();
    let second = store.for_period(period("Q2-2022")).await.unwrap();
    store.latest().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.source().fetch_count(), fetches);
    assert_eq!(store.source().index_fetches(), 1);
}

#[tokio::test]
async fn unknown_period_is_not_found() {
    let store = store(filer());

    let result = store.for_period(period("Q1-2019")).await;

    match result {
        Err(err @ EdgarError::PeriodNotFound(_)) => {
            assert_eq!(err.kind(), ErrorKind::PeriodNotFound);
            assert_eq!(err.to_string(), "No original 13F-HR filing reports period Q1-2019");
        }
        other => panic!("expected PeriodNotFound, got {:?}", other.map(|_| ())),
    }
    assert!(!store.is_resolved(period("Q1-2019")).await);
    assert_eq!(store.source().fetch_count(), 0);
}

#[tokio::test]
async fn concurrent_requests_share_one_resolution() {
    let store = store(filer().with_latency(Duration::from_millis(20)));
    let q2 = period("Q2-2022");

    let (a, b, c) = tokio::join!(store.for_period(q2), store.for_period(q2), store.for_period(q2));

    let a = a.unwrap();
    assert!(Arc::ptr_eq(&a, &b.unwrap()));
    assert!(Arc::ptr_eq(&a, &c.unwrap()));

    let original = FakeSource::urls(Q2_ORIGINAL);
    assert_eq!(store.source().fetches_of(&original.primary), 1);
    assert_eq!(store.source().fetches_of(&original.holdings), 1);
    assert_eq!(store.source().index_fetches(), 1);
}

#[tokio::test]
async fn for_periods_keeps_request_order() {
    let store = store(filer());

    let filings = store
        .for_periods(&[period("Q2-2022"), period("Q1-2022")])
        .await
        .unwrap();

    assert_eq!(filings.len(), 2);
    assert_eq!(filings[0].cover_page().period_of_report, date("2022-06-30"));
    assert_eq!(filings[1].cover_page().period_of_report, date("2022-03-31"));
}

#[tokio::test]
async fn failed_resolution_can_be_retried() {
    let store = store(filer());
    let q2 = period("Q2-2022");
    store
        .source()
        .fail_next_fetch(&FakeSource::urls(Q2_NEW_HOLDINGS).holdings);

    let err = store.for_period(q2).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RetrievalFailure);
    assert!(!store.is_resolved(q2).await);
    assert!(store.snapshot().await.is_empty());

    let filing = store.for_period(q2).await.unwrap();
    assert_eq!(filing.cover_page().portfolio_value, 1_050_000);
    assert!(store.is_resolved(q2).await);
}

#[tokio::test]
async fn malformed_original_is_reported() {
    let source = FakeSource::new().with_filing(
        "2022-08-15",
        FilingKind::Original,
        Q2_ORIGINAL,
        "missing_summary_primary.xml",
        "q2_2022_infotable.xml",
    );
    let store = store(source);

    let err = store.for_period(period("Q2-2022")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    assert!(store.manager_name().is_none());
}

#[tokio::test]
async fn refresh_index_keeps_resolved_periods() {
    let store = store(filer());
    store.latest().await.unwrap();

    store.refresh_index().await.unwrap();

    assert_eq!(store.source().index_fetches(), 2);
    assert!(store.is_resolved(period("Q2-2022")).await);
    assert_eq!(store.latest_period().await, None);
    store.latest().await.unwrap();
    assert_eq!(store.latest_period().await, Some(period("Q2-2022")));
}

fn q2_original_only() -> FakeSource {
    FakeSource::new().with_filing(
        "2022-08-15",
        FilingKind::Original,
        Q2_ORIGINAL,
        "q2_2022_primary.xml",
        "q2_2022_infotable.xml",
    )
}

#[tokio::test]
async fn newer_original_for_cached_period_replaces_it() {
    let store = store(q2_original_only());
    let before = store.latest().await.unwrap();
    assert_eq!(before.cover_page().portfolio_value, 1_000_000);

    store.source().add_filing(
        "2022-08-30",
        FilingKind::Original,
        "0000950123-22-009901",
        "q2_2022_restatement_primary.xml",
        "q2_2022_restatement_infotable.xml",
    );
    store.refresh_index().await.unwrap();
    let after = store.latest().await.unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.cover_page().portfolio_value, 900_000);
    assert_eq!(after.holdings().len(), 2);
    assert_eq!(store.latest_period().await, Some(period("Q2-2022")));
    assert_eq!(
        store.snapshot().await[&period("Q2-2022")].cover_page().portfolio_value,
        900_000
    );
}

#[tokio::test]
async fn amendment_filed_after_resolution_is_folded_in_on_refresh() {
    let store = store(q2_original_only());
    let before = store.latest().await.unwrap();
    assert!(!before.is_amended());

    store.source().add_filing(
        "2022-09-01",
        FilingKind::Amendment,
        Q2_NEW_HOLDINGS,
        "q2_2022_new_holdings_primary.xml",
        "q2_2022_new_holdings_infotable.xml",
    );
    store.refresh_index().await.unwrap();

    let snapshot = store.snapshot().await;
    let refreshed = &snapshot[&period("Q2-2022")];
    assert!(refreshed.is_amended());
    assert_eq!(refreshed.cover_page().portfolio_value, 1_050_000);

    let fetches = store.source().fetch_count();
    let latest = store.latest().await.unwrap();
    assert!(Arc::ptr_eq(refreshed, &latest));
    assert_eq!(store.source().fetch_count(), fetches);
}

#[tokio::test]
async fn failed_re_resolution_keeps_previous_record() {
    let store = store(q2_original_only());
    store.latest().await.unwrap();

    store.source().add_filing(
        "2022-09-01",
        FilingKind::Amendment,
        Q2_NEW_HOLDINGS,
        "q2_2022_new_holdings_primary.xml",
        "q2_2022_new_holdings_infotable.xml",
    );
    store
        .source()
        .fail_next_fetch(&FakeSource::urls(Q2_ORIGINAL).primary);

    assert!(store.refresh_index().await.is_err());
    assert!(store.is_resolved(period("Q2-2022")).await);
    assert!(!store.snapshot().await[&period("Q2-2022")].is_amended());

    let retried = store.for_period(period("Q2-2022")).await.unwrap();
    assert_eq!(retried.cover_page().portfolio_value, 1_050_000);
}

#[tokio::test]
async fn amendments_to_one_period_apply_in_filing_order() {
    let source = q2_original_only()
        .with_filing(
            "2022-09-01",
            FilingKind::Amendment,
            Q2_NEW_HOLDINGS,
            "q2_2022_new_holdings_primary.xml",
            "q2_2022_new_holdings_infotable.xml",
        )
        .with_filing(
            "2022-08-25",
            FilingKind::Amendment,
            "0000950123-22-009644",
            "q2_2022_restatement_primary.xml",
            "q2_2022_restatement_infotable.xml",
        );
    let store = store(source);

    let filing = store.for_period(period("Q2-2022")).await.unwrap();
    let cover = filing.cover_page();

    // restated to 900,000 first, then 50,000 of new holdings added on top
    assert!(cover.amended);
    assert_eq!(cover.submission_type, "13F-HR/A");
    assert_eq!(cover.portfolio_value, 950_000);
    assert_eq!(cover.holding_count, 3);
    assert_eq!(filing.holdings().len(), 3);
}

#[tokio::test]
async fn snapshot_is_chronological_and_serializable() {
    let store = store(filer());
    store
        .for_periods(&[period("Q2-2022"), period("Q1-2022")])
        .await
        .unwrap();

    let snapshot = store.snapshot().await;
    let periods: Vec<_> = snapshot.keys().map(|p| p.to_string()).collect();
    assert_eq!(periods, vec!["Q1-2022", "Q2-2022"]);

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["Q2-2022"]["cover_page"]["portfolio_value"], 1_050_000);
    assert_eq!(json["Q2-2022"]["cover_page"]["amended"], true);
}
