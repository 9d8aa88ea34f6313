use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use crate::models::CotProxy;
use crate::settings::CFTC_REPORT_URL;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Trader categories per row, in report order: dealer, asset manager, leveraged funds, ...
/// Each contributes long / short / spreading, so leveraged funds long is the 7th number.
const LEV_FUNDS_LONG_IDX: usize = 6;
const LEV_FUNDS_SHORT_IDX: usize = 7;

/// Client for the weekly plain-text Financial Futures report (FinFutWk.txt)
#[derive(Clone)]
pub struct ReportClient {
    client: Client,
    url: String,
}

impl ReportClient {
    pub fn new() -> Result<Self> {
        Self::with_url(CFTC_REPORT_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn fetch_text(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to reach CFTC report")?
            .error_for_status()
            .context("CFTC report request failed")?;

        response.text().await.context("Failed to read CFTC report body")
    }

    /// Fetch and parse the report; any failure yields an empty list
    pub async fn latest_proxies(&self, markets: &[(&str, &str)]) -> Vec<CotProxy> {
        match self.fetch_text().await {
            Ok(text) => {
                let proxies = parse_report(&text, markets);
                tracing::info!("Parsed {} markets from weekly COT report", proxies.len());
                proxies
            }
            Err(e) => {
                tracing::warn!("Weekly COT report unavailable: {:#}", e);
                Vec::new()
            }
        }
    }
}

/// Locate each market's block and pull out a leveraged funds net figure
///
/// Two shapes are recognised once a market header has been seen:
/// - a line mentioning `LEV FUNDS` and `NET`: its last integer is the net
/// - a `Positions` line: the next row with enough integers holds
///   leveraged funds long/short at fixed columns
pub fn parse_report(text: &str, markets: &[(&str, &str)]) -> Vec<CotProxy> {
    let mut records = Vec::new();
    let mut current: Option<&str> = None;
    let mut awaiting_positions = false;

    for line in text.lines() {
        let up = line.trim().to_uppercase();

        for (name, symbol) in markets {
            if up.starts_with(name) {
                current = Some(*symbol);
                awaiting_positions = false;
            }
        }

        let symbol = match current {
            Some(symbol) => symbol,
            None => continue,
        };

        if up.contains("LEV FUNDS") && up.contains("NET") {
            if let Some(net) = integer_tokens(&up).last() {
                records.push(CotProxy {
                    symbol: symbol.to_string(),
                    lev_funds_net: *net,
                });
                current = None;
            }
            continue;
        }

        if up == "POSITIONS" {
            awaiting_positions = true;
            continue;
        }

        if awaiting_positions {
            let numbers = integer_tokens(&up);
            if numbers.len() > LEV_FUNDS_SHORT_IDX {
                records.push(CotProxy {
                    symbol: symbol.to_string(),
                    lev_funds_net: numbers[LEV_FUNDS_LONG_IDX] - numbers[LEV_FUNDS_SHORT_IDX],
                });
                current = None;
                awaiting_positions = false;
            }
        }
    }

    records
}

/// Integers on a line, thousands separators removed
///
/// A digit-like token that is not a valid integer (`5-`, `1-2`) makes the
/// whole line unusable, so the result is empty rather than short one number.
fn integer_tokens(line: &str) -> Vec<i64> {
    let cleaned = line.replace(',', "");
    let mut numbers = Vec::new();

    for token in cleaned.split_whitespace() {
        let digits = token.replace('-', "");
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        match token.parse::<i64>() {
            Ok(n) => numbers.push(n),
            Err(_) => {
                tracing::debug!("Ignoring report line with malformed number {:?}: {}", token, line.trim());
                return Vec::new();
            }
        }
    }

    numbers
}
