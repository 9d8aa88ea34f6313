// cot_fetch.rs - Weekly COT collector
//
// Appends the newest Leveraged Funds net per market to the history CSV.
// Meant for a weekly cron/CI job; reads the same settings as the dashboard
// so both agree on the history file (or its published copy via COT_HISTORY_URL).

use clap::Parser;
use cot_sentiment::api::CftcClient;
use cot_sentiment::history;
use cot_sentiment::markets::SOCRATA_MARKETS;
use cot_sentiment::{Result, Settings};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cot_fetch")]
#[command(about = "Append the latest CFTC Leveraged Funds rows to a history CSV")]
struct Args {
    /// Settings file (default: ./sentiment.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// History CSV to create or extend (default: configured history_path)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Socrata dataset endpoint (default: configured endpoints.cftc_api)
    #[arg(long)]
    api: Option<String>,
}

impl Args {
    /// Flags win over settings
    fn resolve(self, settings: &Settings) -> (PathBuf, String) {
        let out = self
            .out
            .unwrap_or_else(|| PathBuf::from(&settings.history_path));
        let api = self
            .api
            .unwrap_or_else(|| settings.endpoints.cftc_api.clone());
        (out, api)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    cot_sentiment::setup_logging("cot_sentiment=info");

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    let (out, api) = args.resolve(&settings);

    let client = CftcClient::with_base_url(api)?;

    let stats = history::collect(&client, SOCRATA_MARKETS, &out).await?;
    println!(
        "✓ Saved {} rows to {} ({} new)",
        stats.total_rows,
        out.display(),
        stats.added
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_come_from_settings() {
        let mut settings = Settings::default();
        settings.history_path = "data/cot.csv".to_string();
        settings.endpoints.cftc_api = "http://mirror.local/cot.json".to_string();

        let args = Args::parse_from(["cot_fetch"]);
        let (out, api) = args.resolve(&settings);

        assert_eq!(out, PathBuf::from("data/cot.csv"));
        assert_eq!(api, "http://mirror.local/cot.json");
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings::default();

        let args = Args::parse_from(["cot_fetch", "--out", "x.csv", "--api", "http://other/cot.json"]);
        let (out, api) = args.resolve(&settings);

        assert_eq!(out, PathBuf::from("x.csv"));
        assert_eq!(api, "http://other/cot.json");
    }
}
