use std::fmt::Write;

use super::Snapshot;
use crate::models::SymbolCard;

/// Fixed-width table of the dashboard cards
pub fn render_table(cards: &[SymbolCard]) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:<8} {:>14} {:>12} {:>16} {:>18} {:>9} {:>9}",
        "Symbol", "Retail % long", "RetailScore", "Inst proxy", "InstitutionalScore", "NetScore", "Direction"
    );
    let _ = writeln!(out, "{}", "─".repeat(92));

    for card in cards {
        let _ = writeln!(
            out,
            "{:<8} {:>14} {:>12.1} {:>16} {:>18.1} {:>9.1} {:>9}",
            card.symbol,
            fmt_opt(card.retail_long_pct, 1),
            card.retail_score,
            fmt_opt(card.institutional_proxy, 0),
            card.institutional_score,
            card.net_score,
            card.direction.to_string()
        );
    }

    out
}

/// Cards plus captions, as printed by `show`
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n📊 Sentiment Dashboard — Retail vs Institutions ({})", snapshot.timestamp);
    let _ = writeln!(
        out,
        "NetScore = {:.1}*Retail + {:.1}*Institutions",
        snapshot.retail_weight, snapshot.institutional_weight
    );
    if !snapshot.retail_available {
        let _ = writeln!(out, "⚠️  Retail sentiment unavailable (scored as neutral)");
    }
    if !snapshot.has_history {
        let _ = writeln!(out, "⚠️  No COT history: institutional scores are neutral, proxy from last week's report");
    }
    let _ = writeln!(out);
    out.push_str(&render_table(&snapshot.cards));
    let _ = writeln!(out, "\nRules: {}", snapshot.rules);

    out
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    }
}
