//! Latest 13F holdings example
//!
//! This example demonstrates the filing store:
//! - Resolve a manager's latest 13F-HR, amendments included
//! - Print the cover page and the largest positions
//! - Resolve the two quarters before it
//! - Write every resolved period to a JSON snapshot
//!
//! Run with: `cargo run --example latest_holdings -- [CIK] [snapshot.json]`
//! Set `RUST_LOG=edgar13f=debug` to follow fetches and merges.

use edgar13f::{Edgar, FilingStore, HoldingsTable, Quarter, ReportingPeriod, TableDetail};
use std::error::Error;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CIK: &str = "0001067983";
const DEFAULT_SNAPSHOT: &str = "snapshot.json";
const TOP_POSITIONS: usize = 10;

fn previous(period: ReportingPeriod) -> ReportingPeriod {
    match period.quarter() {
        Quarter::Q1 => ReportingPeriod::new(period.year() - 1, Quarter::Q4),
        Quarter::Q2 => ReportingPeriod::new(period.year(), Quarter::Q1),
        Quarter::Q3 => ReportingPeriod::new(period.year(), Quarter::Q2),
        Quarter::Q4 => ReportingPeriod::new(period.year(), Quarter::Q3),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    let cik = args.next().unwrap_or_else(|| DEFAULT_CIK.to_string());
    let snapshot_path = args.next().unwrap_or_else(|| DEFAULT_SNAPSHOT.to_string());

    // SEC.gov requires a user agent in the format: "AppName contact@example.com"
    let edgar = Edgar::new("edgar13f Example user@example.com")?;
    let store = FilingStore::new(edgar, &cik)?;

    println!("=== Latest 13F holdings for CIK {} ===\n", cik);

    let latest = store.latest().await?;
    let cover = latest.cover_page();
    println!("Manager:           {}", cover.manager_name);
    println!("Address:           {}", cover.business_address);
    println!("Period of report:  {}", cover.period_of_report);
    println!("Amended:           {}", cover.amended);
    println!("Portfolio value:   ${}", cover.portfolio_value);
    println!("Holding lines:     {}", cover.holding_count);
    println!("Signed by:         {}, {}", cover.signature.name, cover.signature.title);

    if let HoldingsTable::Simplified(mut rows) =
        store.latest_table(TableDetail::Simplified).await?
    {
        rows.sort_by(|a, b| b.value.cmp(&a.value));
        println!("\nTop {} positions:", TOP_POSITIONS.min(rows.len()));
        for (i, row) in rows.iter().take(TOP_POSITIONS).enumerate() {
            println!(
                "   {:>2}. {:<40} {:>9} {:>18} {:>14} {}",
                i + 1,
                row.issuer,
                row.cusip,
                row.value,
                row.amount,
                row.amount_type.code()
            );
        }
    }

    if let Some(latest_period) = store.latest_period().await {
        let earlier = [previous(latest_period), previous(previous(latest_period))];
        println!("\nResolving {} and {}...", earlier[0], earlier[1]);
        match store.for_periods(&earlier).await {
            Ok(filings) => {
                for (period, filing) in earlier.iter().zip(filings) {
                    println!(
                        "   {}: ${} across {} lines{}",
                        period,
                        filing.cover_page().portfolio_value,
                        filing.cover_page().holding_count,
                        if filing.is_amended() { " (amended)" } else { "" }
                    );
                }
            }
            Err(err) => println!("   skipped: {}", err),
        }
    }

    let snapshot = store.snapshot().await;
    std::fs::write(&snapshot_path, serde_json::to_string_pretty(&snapshot)?)?;
    println!("\n✓ Wrote {} periods to {}", snapshot.len(), snapshot_path);

    Ok(())
}
