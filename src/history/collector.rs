use chrono::{Datelike, Duration, NaiveDate};
use std::path::Path;

use crate::api::{CftcClient, ReportClient};
use crate::models::CotRecord;
use crate::Result;

/// Statistics from a collection run
#[derive(Debug, Clone, PartialEq)]
pub struct CollectStats {
    pub fetched: usize,
    pub added: usize,
    pub total_rows: usize,
}

/// Fetch the newest row per market from the CFTC API and append it to `path`
pub async fn collect(
    client: &CftcClient,
    markets: &[(&str, &str)],
    path: &Path,
) -> Result<CollectStats> {
    tracing::info!("Collecting latest COT rows for {} markets", markets.len());

    let fetched = client.latest_records(markets).await;
    append(path, fetched).await
}

/// Same as [`collect`] but from the plain-text weekly report
///
/// The report carries no machine-readable date, so rows are stamped with
/// `report_date` (normally the most recent Tuesday).
pub async fn collect_from_report(
    client: &ReportClient,
    markets: &[(&str, &str)],
    report_date: NaiveDate,
    path: &Path,
) -> Result<CollectStats> {
    tracing::info!("Collecting weekly report rows as of {}", report_date);

    let fetched = client
        .latest_proxies(markets)
        .await
        .into_iter()
        .map(|p| CotRecord {
            date: report_date,
            symbol: p.symbol,
            lev_funds_net: p.lev_funds_net,
        })
        .collect();
    append(path, fetched).await
}

async fn append(path: &Path, fetched: Vec<CotRecord>) -> Result<CollectStats> {
    let old = super::load(path).await;
    let old_len = old.len();
    let fetched_len = fetched.len();

    let merged = super::merge(old, fetched);
    super::save(path, &merged).await?;

    let stats = CollectStats {
        fetched: fetched_len,
        added: merged.len().saturating_sub(old_len),
        total_rows: merged.len(),
    };

    tracing::info!(
        "✓ Saved {} rows to {} ({} fetched, {} new)",
        stats.total_rows,
        path.display(),
        stats.fetched,
        stats.added
    );

    Ok(stats)
}

/// COT positions are as of Tuesday; most recent Tuesday on or before `today`
pub fn last_report_tuesday(today: NaiveDate) -> NaiveDate {
    let days_back = (today.weekday().num_days_from_monday() + 6) % 7;
    today - Duration::days(days_back as i64)
}
