pub mod collector;

pub use collector::{collect, collect_from_report, last_report_tuesday, CollectStats};

use crate::api::cftc::parse_report_date;
use crate::models::{normalize_symbol, CotRecord};
use crate::Result;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

pub const HEADER: [&str; 3] = ["date", "symbol", "lev_funds_net"];

/// Row as it sits on disk; everything is text until validated
#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    symbol: String,
    lev_funds_net: String,
}

/// Load the local history file
///
/// Missing or unreadable files yield an empty history. Rows with an
/// unparseable date or net are skipped.
pub async fn load(path: &Path) -> Vec<CotRecord> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => parse_csv(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No history at {}, starting fresh", path.display());
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("Could not read history {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Parse history CSV text (header `date,symbol,lev_funds_net`)
pub fn parse_csv(text: &str) -> Vec<CotRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    let mut skipped = 0;

    for row in reader.deserialize::<RawRow>() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Skipping malformed history row: {}", e);
                skipped += 1;
                continue;
            }
        };

        let date = match parse_report_date(&row.date) {
            Some(date) => date,
            None => {
                tracing::warn!("Skipping history row with bad date: {:?}", row.date);
                skipped += 1;
                continue;
            }
        };

        // pandas may have written the net as a float ("1234.0")
        let lev_funds_net = match row.lev_funds_net.parse::<f64>() {
            Ok(v) if v.is_finite() => v as i64,
            _ => {
                tracing::warn!("Skipping history row with bad net: {:?}", row.lev_funds_net);
                skipped += 1;
                continue;
            }
        };

        records.push(CotRecord {
            date,
            symbol: row.symbol,
            lev_funds_net,
        });
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} history rows", skipped);
    }

    records
}

/// Concatenate `old` then `new`, drop duplicate (date, symbol) keeping the
/// first, sort by (symbol, date)
pub fn merge(old: Vec<CotRecord>, new: Vec<CotRecord>) -> Vec<CotRecord> {
    let mut seen = HashSet::new();
    let mut merged: Vec<CotRecord> = old
        .into_iter()
        .chain(new)
        .filter(|r| seen.insert((r.date, r.symbol.clone())))
        .collect();

    sort(&mut merged);
    merged
}

pub fn sort(records: &mut [CotRecord]) {
    records.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));
}

/// Write the full history, header included even when empty
pub async fn save(path: &Path, records: &[CotRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    tokio::fs::write(path, to_csv(records)?).await?;

    tracing::debug!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

/// Encode the history as CSV bytes
pub fn to_csv(records: &[CotRecord]) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    wtr.write_record(HEADER)?;
    for record in records {
        wtr.write_record([
            record.date.format("%Y-%m-%d").to_string(),
            record.symbol.clone(),
            record.lev_funds_net.to_string(),
        ])?;
    }

    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(bytes)
}

/// Load a published history from an http(s) URL or a local path
///
/// Symbols are normalised and rows sorted; failures give an empty history.
pub async fn load_remote(client: &reqwest::Client, source: &str) -> Vec<CotRecord> {
    let text = if source.starts_with("http://") || source.starts_with("https://") {
        match fetch_text(client, source).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Could not fetch COT history from {}: {}", source, e);
                return Vec::new();
            }
        }
    } else {
        match tokio::fs::read_to_string(source).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Could not read COT history from {}: {}", source, e);
                return Vec::new();
            }
        }
    };

    let mut records = parse_csv(&text);
    for record in &mut records {
        record.symbol = normalize_symbol(&record.symbol);
    }
    sort(&mut records);

    tracing::info!("Loaded {} COT history rows from {}", records.len(), source);
    records
}

async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let text = client.get(url).send().await?.error_for_status()?.text().await?;
    Ok(text)
}

/// Net values for `symbol`, oldest first
pub fn series(records: &[CotRecord], symbol: &str) -> Vec<i64> {
    let mut rows: Vec<&CotRecord> = records.iter().filter(|r| r.symbol == symbol).collect();
    rows.sort_by_key(|r| r.date);
    rows.into_iter().map(|r| r.lev_funds_net).collect()
}

/// Most recent row for `symbol`
pub fn latest<'a>(records: &'a [CotRecord], symbol: &str) -> Option<&'a CotRecord> {
    records
        .iter()
        .filter(|r| r.symbol == symbol)
        .max_by_key(|r| r.date)
}
