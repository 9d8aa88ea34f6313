use plotters::prelude::*;
use std::ops::Range;

use crate::models::{Direction, IntradayPoint, SymbolCard};
use crate::Result;

const CHART_SIZE: (u32, u32) = (800, 400);
const FLAT_GREY: RGBColor = RGBColor(150, 150, 150);

fn chart_err<E: std::fmt::Debug>(e: E) -> Box<dyn std::error::Error + Send + Sync> {
    format!("chart rendering failed: {:?}", e).into()
}

/// Line chart of labelled values as an SVG document
///
/// X is the sample index; labels are printed under the axis.
pub fn line_chart_svg(title: &str, points: &[(String, f64)], y_range: Range<f64>) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let x_max = points.len().saturating_sub(1).max(1);
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0usize..x_max, y_range)
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .x_labels(6)
            .x_label_formatter(&|i: &usize| {
                points.get(*i).map(|(label, _)| label.clone()).unwrap_or_default()
            })
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(LineSeries::new(
                points.iter().enumerate().map(|(i, (_, v))| (i, *v)),
                &BLUE,
            ))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}

/// Retail % long over the intraday samples
pub fn retail_long_chart(symbol: &str, history: &[IntradayPoint]) -> Result<String> {
    let points: Vec<(String, f64)> = history
        .iter()
        .filter_map(|p| p.retail_long_pct.map(|v| (p.timestamp.format("%H:%M").to_string(), v)))
        .collect();
    line_chart_svg(&format!("{} — % long (Myfxbook)", symbol), &points, 0.0..100.0)
}

/// Contrarian RetailScore over the intraday samples
pub fn retail_score_chart(symbol: &str, history: &[IntradayPoint]) -> Result<String> {
    let points: Vec<(String, f64)> = history
        .iter()
        .map(|p| (p.timestamp.format("%H:%M").to_string(), p.retail_score))
        .collect();
    line_chart_svg(&format!("{} — RetailScore (contrarian)", symbol), &points, -100.0..100.0)
}

/// NetScore per symbol, bars coloured by direction
pub fn net_score_chart(cards: &[SymbolCard], long_threshold: f64, short_threshold: f64) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let n = cards.len().max(1) as f64;
        let mut chart = ChartBuilder::on(&root)
            .caption("NetScore", ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(10)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..n, -100.0..100.0)
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(cards.iter().enumerate().map(|(i, card)| {
                let x = i as f64;
                let color = match card.direction {
                    Direction::Long => GREEN,
                    Direction::Short => RED,
                    Direction::Flat => FLAT_GREY,
                };
                Rectangle::new([(x + 0.15, 0.0), (x + 0.85, card.net_score)], color.filled())
            }))
            .map_err(chart_err)?;

        for threshold in [long_threshold, short_threshold] {
            chart
                .draw_series(LineSeries::new(vec![(0.0, threshold), (n, threshold)], &BLACK))
                .map_err(chart_err)?;
        }

        chart
            .draw_series(cards.iter().enumerate().map(|(i, card)| {
                Text::new(card.symbol.clone(), (i as f64 + 0.2, -92.0), ("sans-serif", 14).into_font())
            }))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_net_score_chart_renders_svg() {
        let cards = vec![SymbolCard {
            symbol: "EURUSD".to_string(),
            retail_long_pct: Some(70.0),
            retail_score: -40.0,
            institutional_proxy: None,
            institutional_score: 0.0,
            net_score: -24.0,
            direction: Direction::Flat,
        }];

        let svg = net_score_chart(&cards, 30.0, -30.0).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("EURUSD"));
    }

    #[test]
    fn test_retail_charts_handle_empty_history() {
        assert!(retail_long_chart("EURUSD", &[]).unwrap().contains("<svg"));
        assert!(retail_score_chart("EURUSD", &[]).unwrap().contains("<svg"));
    }

    #[test]
    fn test_retail_long_chart_with_points() {
        let history: Vec<IntradayPoint> = (0..3)
            .map(|i| IntradayPoint {
                timestamp: Utc::now(),
                symbol: "EURUSD".to_string(),
                retail_long_pct: Some(50.0 + i as f64),
                retail_score: -2.0 * i as f64,
                institutional_score: 0.0,
                net_score: 0.0,
            })
            .collect();

        let svg = retail_long_chart("EURUSD", &history).unwrap();
        assert!(svg.contains("% long"));
    }
}
