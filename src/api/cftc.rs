use anyhow::{Context, Result};
use chrono::NaiveDate;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::models::CotRecord;
use crate::settings::CFTC_API_BASE;

const REQUEST_TIMEOUT_SECS: u64 = 40;
const RATE_LIMIT_RPS: NonZeroU32 = match NonZeroU32::new(4) {
    Some(n) => n,
    None => panic!("rate limit must be non-zero"),
};
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000;
const USER_AGENT: &str = "Mozilla/5.0";

// Type alias for the rate limiter to simplify signatures
type SocrataRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Latest leveraged funds net for one market
#[derive(Debug, Clone, PartialEq)]
pub struct LatestNet {
    pub date: NaiveDate,
    pub lev_funds_net: i64,
}

/// Client for the CFTC Traders in Financial Futures dataset (Socrata SODA API)
///
/// Cloneable; clones share the rate limiter.
#[derive(Clone)]
pub struct CftcClient {
    client: Client,
    base_url: String,
    initial_backoff: Duration,
    rate_limiter: Arc<SocrataRateLimiter>,
}

impl CftcClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(CFTC_API_BASE)
    }

    /// Point the client at another dataset URL (mirrors, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(RATE_LIMIT_RPS))),
        })
    }

    /// Override the first retry delay (doubles on every attempt)
    pub fn with_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Make a rate-limited request with retry on 429 / 5xx / network errors
    async fn make_request(&self, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            let backoff = self.initial_backoff * 2_u32.pow(attempt - 1);

            match self.client.get(&self.base_url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(
                            "CFTC API returned {}, retrying in {:?} (attempt {}/{})",
                            status,
                            backoff,
                            attempt,
                            MAX_RETRIES
                        );
                        last_error = Some(anyhow::anyhow!("CFTC API error ({})", status));
                    } else {
                        // Other errors (4xx) - don't retry
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        anyhow::bail!("CFTC API error ({}): {}", status, error_text);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Network error: {}, retrying in {:?} (attempt {}/{})",
                        e,
                        backoff,
                        attempt,
                        MAX_RETRIES
                    );
                    last_error = Some(e.into());
                }
            }

            if attempt < MAX_RETRIES {
                tokio::time::sleep(backoff).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Failed after {} retries", MAX_RETRIES))
            .context(format!("CFTC API failed after {} attempts", MAX_RETRIES)))
    }

    /// Newest row for markets whose name starts with `market_like`
    ///
    /// Net is computed server-side; `None` when the dataset has no match.
    pub async fn latest_net(&self, market_like: &str) -> Result<Option<LatestNet>> {
        let query = [
            (
                "$select",
                "report_date_as_yyyy_mm_dd, \
                 (lev_money_positions_long_all - lev_money_positions_short_all) as net"
                    .to_string(),
            ),
            (
                "$where",
                format!("market_and_exchange_names like '{}%'", market_like.replace('\'', "''")),
            ),
            ("$order", "report_date_as_yyyy_mm_dd DESC".to_string()),
            ("$limit", "1".to_string()),
        ];

        tracing::debug!("Fetching latest COT row for {}", market_like);

        let response = self.make_request(&query).await?;
        let rows: Vec<Value> = response
            .json()
            .await
            .context("Failed to parse CFTC response")?;

        let row = match rows.first() {
            Some(row) => row,
            None => return Ok(None),
        };

        parse_row(row).map(Some)
    }

    /// Fetch the latest row for every `(cftc_name, symbol)` pair
    ///
    /// Markets that fail or have no data are logged and skipped.
    pub async fn latest_records(&self, markets: &[(&str, &str)]) -> Vec<CotRecord> {
        let mut records = Vec::new();

        for (cftc_name, symbol) in markets {
            match self.latest_net(cftc_name).await {
                Ok(Some(latest)) => {
                    tracing::info!(
                        "{} ({}): {} lev funds net {}",
                        symbol,
                        cftc_name,
                        latest.date,
                        latest.lev_funds_net
                    );
                    records.push(CotRecord {
                        date: latest.date,
                        symbol: symbol.to_string(),
                        lev_funds_net: latest.lev_funds_net,
                    });
                }
                Ok(None) => tracing::warn!("No CFTC rows for market {}", cftc_name),
                Err(e) => tracing::warn!("Skipping {}: {:#}", cftc_name, e),
            }
        }

        records
    }
}

/// Extract date and net from one SODA row
fn parse_row(row: &Value) -> Result<LatestNet> {
    let raw_date = row
        .get("report_date_as_yyyy_mm_dd")
        .and_then(Value::as_str)
        .context("CFTC row has no report date")?;
    let date = parse_report_date(raw_date)
        .with_context(|| format!("Invalid CFTC report date: {}", raw_date))?;

    // `net` sometimes arrives as "123.0"; fall back to long - short
    let lev_funds_net = match row.get("net").and_then(value_as_f64) {
        Some(net) => net as i64,
        None => {
            let long = field_as_i64(row, "lev_money_positions_long_all");
            let short = field_as_i64(row, "lev_money_positions_short_all");
            long - short
        }
    };

    Ok(LatestNet {
        date,
        lev_funds_net,
    })
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DDT00:00:00.000` (only the date part is kept)
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Numbers or numeric strings
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn field_as_i64(row: &Value, key: &str) -> i64 {
    row.get(key).and_then(value_as_f64).map(|v| v as i64).unwrap_or(0)
}
