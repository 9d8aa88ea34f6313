// Sentiment dashboard
// Blends retail outlook with COT positioning into per-symbol cards

pub mod cache;
pub mod charts;
pub mod intraday;
pub mod render;
pub mod server;

pub use cache::TtlCache;
pub use intraday::IntradayHistory;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::api::{MyfxbookClient, ReportClient};
use crate::history;
use crate::markets::{has_cot_mapping, REPORT_MARKETS};
use crate::models::{CotProxy, CotRecord, IntradayPoint, RetailOutlook, SymbolCard};
use crate::scoring::{institutional_score, retail_score, ScoreConfig};
use crate::settings::Settings;
use crate::Result;

/// COT history rows shown under the cards
pub const HISTORY_TAIL_ROWS: usize = 20;

/// What the viewer asked for (symbol selection plus sidebar controls)
#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub symbols: Vec<String>,
    pub config: ScoreConfig,
}

/// Everything one dashboard render needs
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub cards: Vec<SymbolCard>,
    pub retail_weight: f64,
    pub institutional_weight: f64,
    pub long_threshold: f64,
    pub short_threshold: f64,
    pub rules: String,
    /// False when retail credentials are missing or the fetch failed
    pub retail_available: bool,
    /// True when institutional scores come from a weekly history
    pub has_history: bool,
    pub history_tail: Vec<CotRecord>,
    pub report: Vec<CotProxy>,
}

/// Score every requested symbol
///
/// With a non-empty history the institutional leg is its z-score and the
/// proxy its latest net. Without one the report net is shown and the leg
/// stays neutral.
pub fn build_cards(
    symbols: &[String],
    retail: Option<&[RetailOutlook]>,
    cot_history: &[CotRecord],
    report: &[CotProxy],
    config: &ScoreConfig,
) -> Vec<SymbolCard> {
    symbols
        .iter()
        .map(|symbol| {
            let retail_long_pct = retail
                .and_then(|items| items.iter().find(|r| &r.symbol == symbol))
                .map(|r| r.long_pct);
            let r_score = retail_score(retail_long_pct);

            let (institutional_proxy, inst_score) = if !cot_history.is_empty() {
                (
                    history::latest(cot_history, symbol).map(|r| r.lev_funds_net as f64),
                    institutional_score(cot_history, symbol),
                )
            } else {
                (
                    report
                        .iter()
                        .find(|p| &p.symbol == symbol)
                        .map(|p| p.lev_funds_net as f64),
                    0.0,
                )
            };

            let net_score = config.net_score(r_score, inst_score);

            SymbolCard {
                symbol: symbol.clone(),
                retail_long_pct,
                retail_score: r_score,
                institutional_proxy,
                institutional_score: inst_score,
                net_score,
                direction: config.direction(net_score),
            }
        })
        .collect()
}

/// Sources, caches and intraday memory behind the UI
pub struct Dashboard {
    settings: Settings,
    myfxbook: MyfxbookClient,
    report: ReportClient,
    http: reqwest::Client,
    retail_cache: TtlCache<Vec<RetailOutlook>>,
    report_cache: TtlCache<Vec<CotProxy>>,
    history_cache: TtlCache<Vec<CotRecord>>,
    intraday: Mutex<IntradayHistory>,
}

impl Dashboard {
    pub fn new(settings: Settings) -> Result<Self> {
        let report = ReportClient::with_url(settings.endpoints.cftc_report.clone())?;
        let myfxbook = MyfxbookClient::with_base_url(settings.endpoints.myfxbook.clone());
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        for symbol in settings.symbols.iter().filter(|s| !has_cot_mapping(s)) {
            tracing::info!("{} has no COT market; its institutional leg needs a history row", symbol);
        }

        let retail_cache = TtlCache::new(Duration::from_secs(settings.refresh.retail_seconds));
        let report_cache = TtlCache::new(Duration::from_secs(settings.refresh.report_seconds));
        let history_cache = TtlCache::new(Duration::from_secs(settings.refresh.history_seconds));
        tracing::debug!(
            "Cache TTLs: retail {:?}, report {:?}, history {:?}",
            retail_cache.ttl(),
            report_cache.ttl(),
            history_cache.ttl()
        );

        Ok(Self {
            retail_cache,
            report_cache,
            history_cache,
            intraday: Mutex::new(IntradayHistory::new()),
            settings,
            myfxbook,
            report,
            http,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Configured symbols and scoring
    pub fn default_view(&self) -> Result<ViewOptions> {
        Ok(ViewOptions {
            symbols: self.settings.symbols.clone(),
            config: self.settings.score_config()?,
        })
    }

    /// Pull every source (through the caches), score, and record intraday samples
    pub async fn refresh(&self, view: &ViewOptions) -> Snapshot {
        let retail = self.retail().await;
        let report = self
            .report_cache
            .get_or_fetch(|| self.report.latest_proxies(REPORT_MARKETS))
            .await;
        let cot_history = self.history_cache.get_or_fetch(|| self.load_history()).await;

        let cards = build_cards(
            &view.symbols,
            retail.as_deref(),
            &cot_history,
            &report,
            &view.config,
        );

        let timestamp = Utc::now().trunc_subsecs(0);
        {
            let mut intraday = self.intraday.lock().await;
            if intraday.is_empty() {
                tracing::info!("📈 Recording intraday samples from {}", timestamp);
            }
            intraday.push_many(cards.iter().map(|c| IntradayPoint::from_card(timestamp, c)));
            tracing::debug!("Intraday history holds {} points", intraday.len());
        }

        let tail_start = cot_history.len().saturating_sub(HISTORY_TAIL_ROWS);

        Snapshot {
            timestamp,
            retail_weight: view.config.retail_weight(),
            institutional_weight: view.config.institutional_weight(),
            long_threshold: view.config.long_threshold,
            short_threshold: view.config.short_threshold,
            rules: view.config.rules_caption(),
            retail_available: retail.is_some(),
            has_history: !cot_history.is_empty(),
            history_tail: cot_history[tail_start..].to_vec(),
            report,
            cards,
        }
    }

    /// Intraday samples for one symbol
    pub async fn retail_history(&self, symbol: &str) -> Vec<IntradayPoint> {
        self.intraday.lock().await.for_symbol(symbol)
    }

    /// Full cached COT history (empty if none configured)
    pub async fn cot_history(&self) -> Vec<CotRecord> {
        self.history_cache.get_or_fetch(|| self.load_history()).await
    }

    /// Latest weekly report proxies
    pub async fn cot_last_week(&self) -> Vec<CotProxy> {
        self.report_cache
            .get_or_fetch(|| self.report.latest_proxies(REPORT_MARKETS))
            .await
    }

    async fn retail(&self) -> Option<Vec<RetailOutlook>> {
        let (email, password) = match (
            &self.settings.secrets.myfxbook_email,
            &self.settings.secrets.myfxbook_password,
        ) {
            (Some(email), Some(password)) => (email, password),
            _ => {
                tracing::warn!("Set MYFXBOOK_EMAIL and MYFXBOOK_PASSWORD to enable retail sentiment");
                return None;
            }
        };

        match self
            .retail_cache
            .get_or_try_fetch(|| self.myfxbook.community_outlook(email, password))
            .await
        {
            Ok(outlook) => Some(outlook),
            Err(e) => {
                tracing::error!("Myfxbook fetch failed: {:#}", e);
                None
            }
        }
    }

    /// COT_HISTORY_URL if set, otherwise the collector's local file when present
    async fn load_history(&self) -> Vec<CotRecord> {
        if let Some(url) = &self.settings.secrets.cot_history_url {
            return history::load_remote(&self.http, url).await;
        }

        let local = Path::new(&self.settings.history_path);
        if local.exists() {
            return history::load_remote(&self.http, &self.settings.history_path).await;
        }

        tracing::info!("No COT history configured; institutional scores use the weekly proxy only");
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use chrono::NaiveDate;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn weekly(symbol: &str, values: &[i64]) -> Vec<CotRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| CotRecord {
                date: start + chrono::Duration::weeks(i as i64),
                symbol: symbol.to_string(),
                lev_funds_net: *v,
            })
            .collect()
    }

    #[test]
    fn test_cards_retail_only() {
        let retail = vec![RetailOutlook {
            symbol: "EURUSD".to_string(),
            long_pct: 80.0,
            short_pct: 20.0,
        }];

        let cards = build_cards(
            &symbols(&["EURUSD", "GER40"]),
            Some(retail.as_slice()),
            &[],
            &[],
            &ScoreConfig::default(),
        );

        // -60 retail * 0.6 = -36 -> SHORT
        assert_eq!(cards[0].retail_long_pct, Some(80.0));
        assert_eq!(cards[0].retail_score, -60.0);
        assert!((cards[0].net_score + 36.0).abs() < 1e-9);
        assert_eq!(cards[0].direction, Direction::Short);

        assert_eq!(cards[1].retail_long_pct, None);
        assert_eq!(cards[1].net_score, 0.0);
        assert_eq!(cards[1].direction, Direction::Flat);
    }

    #[test]
    fn test_cards_use_report_proxy_without_history() {
        let report = vec![CotProxy {
            symbol: "US500".to_string(),
            lev_funds_net: -12000,
        }];

        let cards = build_cards(&symbols(&["US500"]), None, &[], &report, &ScoreConfig::default());

        assert_eq!(cards[0].institutional_proxy, Some(-12000.0));
        assert_eq!(cards[0].institutional_score, 0.0);
    }

    #[test]
    fn test_cards_prefer_history_over_report() {
        let history = weekly("EURUSD", &[0, 10, 0, 10, 0, 40]);
        let report = vec![CotProxy {
            symbol: "EURUSD".to_string(),
            lev_funds_net: 999,
        }];

        let cards = build_cards(&symbols(&["EURUSD"]), None, &history, &report, &ScoreConfig::default());

        assert_eq!(cards[0].institutional_proxy, Some(40.0));
        assert!(cards[0].institutional_score > 0.0);
        let expected_net = 0.4 * cards[0].institutional_score;
        assert!((cards[0].net_score - expected_net).abs() < 1e-9);
    }

    #[test]
    fn test_caches_use_configured_ttls() {
        let mut settings = Settings::default();
        settings.refresh.retail_seconds = 7;
        settings.refresh.report_seconds = 70;
        settings.refresh.history_seconds = 700;

        let dashboard = Dashboard::new(settings).unwrap();
        assert_eq!(dashboard.retail_cache.ttl(), Duration::from_secs(7));
        assert_eq!(dashboard.report_cache.ttl(), Duration::from_secs(70));
        assert_eq!(dashboard.history_cache.ttl(), Duration::from_secs(700));
    }

    #[tokio::test]
    async fn test_refresh_without_credentials_records_intraday() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/FinFutWk.txt")
            .with_status(200)
            .with_body("AUSTRALIAN DOLLAR - CME\nLEV FUNDS NET 2,000\n")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.endpoints.cftc_report = format!("{}/FinFutWk.txt", server.url());
        settings.history_path = dir.path().join("missing.csv").display().to_string();

        let dashboard = Dashboard::new(settings).unwrap();
        let view = dashboard.default_view().unwrap();
        let snapshot = dashboard.refresh(&view).await;

        assert!(!snapshot.retail_available);
        assert!(!snapshot.has_history);
        assert_eq!(snapshot.cards.len(), 6);
        let aud = snapshot.cards.iter().find(|c| c.symbol == "AUDUSD").unwrap();
        assert_eq!(aud.institutional_proxy, Some(2000.0));

        dashboard.refresh(&view).await;
        assert_eq!(dashboard.retail_history("AUDUSD").await.len(), 2);
        assert_eq!(dashboard.intraday.lock().await.len(), 12);
    }
}
