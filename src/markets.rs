// CFTC market name -> local symbol mappings
//
// The Socrata dataset and the weekly text report spell some markets
// differently, so each source gets its own table.

/// Matched with `market_and_exchange_names like '<name>%'`
pub const SOCRATA_MARKETS: &[(&str, &str)] = &[
    ("EURO FX", "EURUSD"),
    ("BRITISH POUND", "GBPUSD"),
    ("AUSTRALIAN DOLLAR", "AUDUSD"),
    ("E-MINI S&P 500", "US500"),
    ("RUSSELL E-MINI", "US2000"),
];

/// Matched as an upper-cased line prefix in FinFutWk.txt
pub const REPORT_MARKETS: &[(&str, &str)] = &[
    ("EURO FX", "EURUSD"),
    ("BRITISH POUND STERLING", "GBPUSD"),
    ("AUSTRALIAN DOLLAR", "AUDUSD"),
    ("E-MINI S&P 500", "US500"),
    ("RUSSELL 2000 MINI", "US2000"),
];

/// Symbols shown on the dashboard when nothing else is configured
pub const DEFAULT_SYMBOLS: &[&str] = &["EURUSD", "GBPUSD", "AUDUSD", "US500", "US2000", "GER40"];

/// True if the symbol is backed by COT data in either source
pub fn has_cot_mapping(symbol: &str) -> bool {
    SOCRATA_MARKETS
        .iter()
        .chain(REPORT_MARKETS.iter())
        .any(|(_, sym)| *sym == symbol)
}
