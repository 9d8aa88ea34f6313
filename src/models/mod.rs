use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One weekly row of the COT history file
///
/// Column order on disk is `date,symbol,lev_funds_net`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CotRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub lev_funds_net: i64,
}

/// Leveraged funds net taken from the plain-text weekly report (no date attached)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CotProxy {
    pub symbol: String,
    pub lev_funds_net: i64,
}

/// Retail community outlook for one symbol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetailOutlook {
    pub symbol: String,
    pub long_pct: f64,
    pub short_pct: f64,
}

/// Directional call derived from the NetScore
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
            Direction::Flat => "FLAT",
        };
        f.write_str(s)
    }
}

/// One row of the dashboard table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolCard {
    pub symbol: String,
    pub retail_long_pct: Option<f64>,
    pub retail_score: f64,
    /// Raw leveraged funds net (history tail or report proxy)
    pub institutional_proxy: Option<f64>,
    pub institutional_score: f64,
    pub net_score: f64,
    pub direction: Direction,
}

/// Intraday sample kept in memory for the retail charts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntradayPoint {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub retail_long_pct: Option<f64>,
    pub retail_score: f64,
    pub institutional_score: f64,
    pub net_score: f64,
}

impl IntradayPoint {
    /// Build a sample from a card, scores rounded to one decimal
    pub fn from_card(timestamp: DateTime<Utc>, card: &SymbolCard) -> Self {
        Self {
            timestamp,
            symbol: card.symbol.clone(),
            retail_long_pct: card.retail_long_pct,
            retail_score: round1(card.retail_score),
            institutional_score: round1(card.institutional_score),
            net_score: round1(card.net_score),
        }
    }
}

/// Strip dots and upper-case (`"eur.usd"` -> `"EURUSD"`)
pub fn normalize_symbol(raw: &str) -> String {
    raw.replace('.', "").to_uppercase()
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
