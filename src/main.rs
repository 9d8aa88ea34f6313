use clap::{Parser, Subcommand, ValueEnum};
use cot_sentiment::api::{CftcClient, ReportClient};
use cot_sentiment::dashboard::{render, server, Dashboard};
use cot_sentiment::history::{self, last_report_tuesday};
use cot_sentiment::markets::{REPORT_MARKETS, SOCRATA_MARKETS};
use cot_sentiment::{Result, Settings};
use chrono::{NaiveDate, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "cot_sentiment")]
#[command(about = "Retail vs institutional sentiment dashboard (Myfxbook + CFTC COT)")]
struct Cli {
    /// Settings file (default: ./sentiment.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web dashboard
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Refresh once and print the cards
    Show,
    /// Append the latest weekly COT rows to the history CSV
    Fetch {
        #[arg(long, value_enum, default_value_t = Source::Api)]
        source: Source,

        /// Output CSV (default: configured history_path)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Date stamped on report rows (default: most recent Tuesday)
        #[arg(long)]
        report_date: Option<NaiveDate>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Source {
    /// CFTC Socrata API
    Api,
    /// FinFutWk.txt weekly report
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    cot_sentiment::setup_logging("cot_sentiment=info");

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => run_server(settings, bind).await,
        Command::Show => show(settings).await,
        Command::Fetch {
            source,
            out,
            report_date,
        } => fetch(&settings, source, out, report_date).await,
    }
}

async fn run_server(settings: Settings, bind: Option<String>) -> Result<()> {
    tracing::info!("🚀 Sentiment dashboard starting");

    if !settings.has_myfxbook_credentials() {
        tracing::warn!("MYFXBOOK_EMAIL / MYFXBOOK_PASSWORD not set; retail legs stay neutral");
    }

    let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
    let interval = Duration::from_secs(settings.refresh.retail_seconds.max(1));

    let dashboard = Arc::new(Dashboard::new(settings)?);
    let refresher = server::spawn_refresh_loop(dashboard.clone(), interval);

    let result = server::serve(dashboard, &bind).await;
    refresher.abort();
    result
}

async fn show(settings: Settings) -> Result<()> {
    let dashboard = Dashboard::new(settings)?;
    let view = dashboard.default_view()?;
    let snapshot = dashboard.refresh(&view).await;

    println!("{}", render::render_snapshot(&snapshot));
    Ok(())
}

async fn fetch(
    settings: &Settings,
    source: Source,
    out: Option<PathBuf>,
    report_date: Option<NaiveDate>,
) -> Result<()> {
    let path = out.unwrap_or_else(|| PathBuf::from(&settings.history_path));

    let stats = match source {
        Source::Api => {
            let client = CftcClient::with_base_url(settings.endpoints.cftc_api.clone())?;
            history::collect(&client, SOCRATA_MARKETS, &path).await?
        }
        Source::Report => {
            let client = ReportClient::with_url(settings.endpoints.cftc_report.clone())?;
            let date = report_date.unwrap_or_else(|| last_report_tuesday(Utc::now().date_naive()));
            history::collect_from_report(&client, REPORT_MARKETS, date, &path).await?
        }
    };

    if stats.fetched == 0 {
        tracing::warn!("No COT rows fetched from {:?}", source);
    }

    println!(
        "✓ {} rows in {} ({} fetched, {} new)",
        stats.total_rows,
        path.display(),
        stats.fetched,
        stats.added
    );
    Ok(())
}
