// HTTP dashboard
// Cards, COT tables and SVG charts over the shared `Dashboard`

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{charts, Dashboard, Snapshot, ViewOptions};
use crate::models::{normalize_symbol, CotProxy, CotRecord};
use crate::scoring::ScoreConfig;

// Sidebar slider ranges
const WEIGHT_STEP: f64 = 0.1;
const THRESHOLD_MIN: f64 = 10.0;
const THRESHOLD_MAX: f64 = 60.0;
const THRESHOLD_STEP: f64 = 5.0;

/// Shared state for handlers
struct AppState {
    dashboard: Arc<Dashboard>,
    start_time: Instant,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct HealthResponse {
    status: String,
    uptime_seconds: u64,
}

/// Sidebar controls; anything omitted falls back to the configured value
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub retail_weight: Option<f64>,
    /// LONG when Net >= this
    pub long: Option<f64>,
    /// SHORT when Net <= -this (sign is ignored)
    pub short: Option<f64>,
    /// Comma separated subset of the configured symbols
    pub symbols: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuery {
    kind: Option<String>,
}

fn snap(value: f64, min: f64, max: f64, step: f64) -> f64 {
    let clamped = value.clamp(min, max);
    ((clamped - min) / step).round() * step + min
}

/// Apply query overrides within the slider ranges
pub fn resolve_view(defaults: &ViewOptions, query: &ViewQuery) -> ViewOptions {
    let retail_weight = query
        .retail_weight
        .filter(|w| w.is_finite())
        .map(|w| snap(w, 0.0, 1.0, WEIGHT_STEP))
        .unwrap_or(defaults.config.retail_weight());
    let long = query
        .long
        .filter(|v| v.is_finite())
        .map(|v| snap(v.abs(), THRESHOLD_MIN, THRESHOLD_MAX, THRESHOLD_STEP))
        .unwrap_or(defaults.config.long_threshold);
    let short = query
        .short
        .filter(|v| v.is_finite())
        .map(|v| -snap(v.abs(), THRESHOLD_MIN, THRESHOLD_MAX, THRESHOLD_STEP))
        .unwrap_or(defaults.config.short_threshold);

    let config = ScoreConfig::new(retail_weight, long, short).unwrap_or(defaults.config);

    let symbols = match query.symbols.as_deref().map(str::trim) {
        Some(list) if !list.is_empty() => list
            .split(',')
            .map(|s| normalize_symbol(s.trim()))
            .filter(|s| defaults.symbols.contains(s))
            .collect(),
        _ => defaults.symbols.clone(),
    };

    ViewOptions { symbols, config }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

async fn snapshot_for(state: &AppState, query: &ViewQuery) -> Result<Snapshot, Response> {
    let defaults = state.dashboard.default_view().map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response()
    })?;
    let view = resolve_view(&defaults, query);
    Ok(state.dashboard.refresh(&view).await)
}

/// Cards plus captions as JSON
async fn cards_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Response {
    match snapshot_for(&state, &query).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(response) => response,
    }
}

async fn retail_history_handler(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> impl IntoResponse {
    Json(state.dashboard.retail_history(&normalize_symbol(&symbol)).await)
}

async fn cot_history_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.dashboard.cot_history().await)
}

async fn cot_last_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.dashboard.cot_last_week().await)
}

fn svg_response(result: crate::Result<String>) -> Response {
    match result {
        Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => {
            tracing::error!("Chart failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// `/chart/retail/EURUSD.svg`, `?kind=score` for the RetailScore line
async fn retail_chart_handler(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    Query(chart): Query<ChartQuery>,
) -> Response {
    let symbol = normalize_symbol(file.trim_end_matches(".svg"));
    let history = state.dashboard.retail_history(&symbol).await;

    match chart.kind.as_deref() {
        Some("score") => svg_response(charts::retail_score_chart(&symbol, &history)),
        _ => svg_response(charts::retail_long_chart(&symbol, &history)),
    }
}

async fn net_score_chart_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Response {
    match snapshot_for(&state, &query).await {
        Ok(snapshot) => svg_response(charts::net_score_chart(
            &snapshot.cards,
            snapshot.long_threshold,
            snapshot.short_threshold,
        )),
        Err(response) => response,
    }
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Response {
    match snapshot_for(&state, &query).await {
        Ok(snapshot) => Html(render_index(&snapshot, &query)).into_response(),
        Err(response) => response,
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn opt_cell(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "-".to_string())
}

/// Query string carrying the viewer's controls to chart URLs
fn controls_query(snapshot: &Snapshot, query: &ViewQuery) -> String {
    let mut qs = format!(
        "retail_weight={}&long={}&short={}",
        snapshot.retail_weight,
        snapshot.long_threshold,
        snapshot.short_threshold.abs()
    );
    if let Some(symbols) = &query.symbols {
        let _ = write!(qs, "&symbols={}", escape(symbols));
    }
    qs
}

fn render_cot_history(rows: &[CotRecord]) -> String {
    let mut out = String::from("<table><tr><th>date</th><th>symbol</th><th>lev_funds_net</th></tr>");
    for row in rows {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            row.date,
            escape(&row.symbol),
            row.lev_funds_net
        );
    }
    out.push_str("</table>");
    out
}

fn render_cot_last(rows: &[CotProxy]) -> String {
    let mut out = String::from("<table><tr><th>symbol</th><th>lev_funds_net</th></tr>");
    for row in rows {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(&row.symbol),
            row.lev_funds_net
        );
    }
    out.push_str("</table>");
    out
}

/// Single-page dashboard: cards, retail charts, COT tables, NetScore chart
fn render_index(snapshot: &Snapshot, query: &ViewQuery) -> String {
    let mut html = String::new();
    let qs = controls_query(snapshot, query);

    let _ = write!(
        html,
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Sentiment Dashboard</title>\
         <style>body{{font-family:sans-serif;margin:2em}}table{{border-collapse:collapse}}\
         td,th{{border:1px solid #ccc;padding:4px 8px;text-align:right}}</style></head><body>\
         <h1>📊 Sentiment Dashboard — Retail vs Institutions</h1>\
         <p>Retail: Myfxbook (contrarian). Institutions: COT (Leveraged Funds). \
         NetScore = {:.1}*Retail + {:.1}*Institutions. Updated {}.</p>",
        snapshot.retail_weight, snapshot.institutional_weight, snapshot.timestamp
    );

    if !snapshot.retail_available {
        html.push_str("<p><b>Set MYFXBOOK_EMAIL and MYFXBOOK_PASSWORD to enable retail sentiment.</b></p>");
    }

    html.push_str(
        "<table><tr><th>Symbol</th><th>Retail % long</th><th>RetailScore</th>\
         <th>Inst proxy (lev funds net)</th><th>InstitutionalScore</th><th>NetScore</th><th>Direction</th></tr>",
    );
    for card in &snapshot.cards {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{:.1}</td><td>{}</td><td>{:.1}</td><td>{:.1}</td><td>{}</td></tr>",
            escape(&card.symbol),
            opt_cell(card.retail_long_pct, 1),
            card.retail_score,
            opt_cell(card.institutional_proxy, 0),
            card.institutional_score,
            card.net_score,
            card.direction
        );
    }
    html.push_str("</table>");

    html.push_str("<h2>Retail (intraday)</h2>");
    for card in &snapshot.cards {
        let symbol = escape(&card.symbol);
        let _ = write!(
            html,
            "<div><img src=\"/chart/retail/{0}.svg\" alt=\"{0} % long\">\
             <img src=\"/chart/retail/{0}.svg?kind=score\" alt=\"{0} RetailScore\"></div>",
            symbol
        );
    }

    html.push_str("<h2>Institutions (weekly)</h2>");
    if snapshot.has_history {
        html.push_str("<p>Z-score of the weekly change (from the COT history).</p>");
        html.push_str(&render_cot_history(&snapshot.history_tail));
    } else {
        html.push_str(
            "<p>Last week's proxy only (no z-score). Set COT_HISTORY_URL or run the collector \
             to get an InstitutionalScore.</p>",
        );
    }
    html.push_str(&render_cot_last(&snapshot.report));

    let _ = write!(
        html,
        "<h2>NetScore &amp; signal</h2><p>Rules: {}</p>\
         <img src=\"/chart/netscore.svg?{}\" alt=\"NetScore\"></body></html>",
        escape(&snapshot.rules),
        qs
    );

    html
}

/// Creates the router with all endpoints
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/cards", get(cards_handler))
        .route("/api/history/:symbol", get(retail_history_handler))
        .route("/api/cot/history", get(cot_history_handler))
        .route("/api/cot/last", get(cot_last_handler))
        .route("/chart/retail/:file", get(retail_chart_handler))
        .route("/chart/netscore.svg", get(net_score_chart_handler))
        .with_state(state)
}

/// Refresh with the configured view every `interval` so intraday charts fill
/// in even with nobody watching
pub fn spawn_refresh_loop(dashboard: Arc<Dashboard>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match dashboard.default_view() {
                Ok(view) => {
                    let snapshot = dashboard.refresh(&view).await;
                    tracing::info!(
                        "🔄 Refreshed {} symbols (retail: {}, history: {})",
                        snapshot.cards.len(),
                        snapshot.retail_available,
                        snapshot.has_history
                    );
                }
                Err(e) => tracing::error!("Refresh skipped: {}", e),
            }
        }
    })
}

/// Bind and serve until the listener fails
pub async fn serve(dashboard: Arc<Dashboard>, bind: &str) -> crate::Result<()> {
    let state = Arc::new(AppState {
        dashboard,
        start_time: Instant::now(),
    });

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("🌐 Dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
