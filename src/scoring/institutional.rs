use crate::history;
use crate::indicators::{
    calculate_diff, calculate_mean, calculate_rolling_std, calculate_sma, calculate_std,
    calculate_zscore, logistic_scale,
};
use crate::models::CotRecord;

use super::{MIN_HISTORY_ROWS, ZSCORE_WINDOW};

/// Institutional score for `symbol` from the weekly COT history
///
/// Z-score of the latest week-over-week change in leveraged funds net,
/// squashed onto [-100, 100]. Neutral (0) when history is too short or flat.
pub fn institutional_score(records: &[CotRecord], symbol: &str) -> f64 {
    let series: Vec<f64> = history::series(records, symbol)
        .into_iter()
        .map(|v| v as f64)
        .collect();
    institutional_score_from_series(&series)
}

/// Same as [`institutional_score`] for an already-extracted, date-ordered series
pub fn institutional_score_from_series(series: &[f64]) -> f64 {
    if series.len() < MIN_HISTORY_ROWS {
        return 0.0;
    }

    // The rolling window is aligned with the rows, and its first row has no
    // change yet; a window that reaches back to it is undefined.
    if series.len() == ZSCORE_WINDOW {
        return 0.0;
    }

    let delta = calculate_diff(series);
    let last = match delta.last() {
        Some(v) => *v,
        None => return 0.0,
    };

    // Full window: rolling mean / sample std. Short history: all deltas, population std.
    let (mu, sigma) = if series.len() > ZSCORE_WINDOW {
        (
            calculate_sma(&delta, ZSCORE_WINDOW),
            calculate_rolling_std(&delta, ZSCORE_WINDOW),
        )
    } else {
        (calculate_mean(&delta), calculate_std(&delta, 0))
    };

    match (mu, sigma) {
        (Some(mu), Some(sigma)) => calculate_zscore(last, mu, sigma)
            .map(logistic_scale)
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

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
    fn test_short_history_is_neutral() {
        let records = weekly("EURUSD", &[1, 2, 3, 4, 5]);
        assert_eq!(institutional_score(&records, "EURUSD"), 0.0);
    }

    #[test]
    fn test_unknown_symbol_is_neutral() {
        let records = weekly("EURUSD", &[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(institutional_score(&records, "GER40"), 0.0);
    }

    #[test]
    fn test_constant_change_is_neutral() {
        // Every delta is +100, so sigma is zero
        let records = weekly("EURUSD", &[100, 200, 300, 400, 500, 600, 700]);
        assert_eq!(institutional_score(&records, "EURUSD"), 0.0);
    }

    #[test]
    fn test_short_history_uses_population_std() {
        // deltas: [10, -10, 10, -10, 40]; mean 8, population std 18.330...
        let series = [0.0, 10.0, 0.0, 10.0, 0.0, 40.0];
        let delta = [10.0, -10.0, 10.0, -10.0, 40.0];
        let mu = 8.0;
        let sigma = (delta.iter().map(|d: &f64| (d - mu).powi(2)).sum::<f64>() / 5.0).sqrt();
        let expected = logistic_scale((40.0 - mu) / sigma);

        let score = institutional_score_from_series(&series);
        assert!((score - expected).abs() < 1e-9);
        assert!(score > 0.0);
    }

    #[test]
    fn test_full_window_uses_last_13_deltas() {
        // 20 rows -> 19 deltas; the first deltas are huge and must be ignored
        let mut series = vec![0.0, 1_000_000.0, 0.0, 1_000_000.0, 0.0, 1_000_000.0, 0.0];
        let mut level = 0.0;
        for i in 0..12 {
            level += if i % 2 == 0 { 5.0 } else { -5.0 };
            series.push(level);
        }
        level -= 50.0;
        series.push(level);
        assert_eq!(series.len(), 20);

        let delta = calculate_diff(&series);
        let window = &delta[delta.len() - 13..];
        let mu = window.iter().sum::<f64>() / 13.0;
        let sigma = (window.iter().map(|d| (d - mu).powi(2)).sum::<f64>() / 12.0).sqrt();
        let expected = logistic_scale((-50.0 - mu) / sigma);

        let score = institutional_score_from_series(&series);
        assert!((score - expected).abs() < 1e-9);
        assert!(score < 0.0);
        assert!(score > -100.0);
    }

    fn spike_series(quiet_weeks: usize) -> Vec<f64> {
        let mut series: Vec<f64> = (0..quiet_weeks)
            .map(|i| if i % 2 == 0 { 100.0 } else { 110.0 })
            .collect();
        series.push(500.0);
        series
    }

    #[test]
    fn test_thirteen_rows_is_neutral() {
        // The 13-week window still contains the first row, which has no change
        let series = spike_series(12);
        assert_eq!(series.len(), ZSCORE_WINDOW);
        assert_eq!(institutional_score_from_series(&series), 0.0);
    }

    #[test]
    fn test_twelve_rows_uses_short_history() {
        let series = spike_series(11);
        let delta = calculate_diff(&series);
        let mu = calculate_mean(&delta).unwrap();
        let sigma = calculate_std(&delta, 0).unwrap();
        let expected = logistic_scale((delta[delta.len() - 1] - mu) / sigma);

        let score = institutional_score_from_series(&series);
        assert!((score - expected).abs() < 1e-9);
        assert!(score > 90.0);
    }

    #[test]
    fn test_fourteen_rows_uses_rolling_sample_std() {
        let series = spike_series(13);
        assert_eq!(series.len(), ZSCORE_WINDOW + 1);

        let delta = calculate_diff(&series);
        assert_eq!(delta.len(), ZSCORE_WINDOW);
        let mu = delta.iter().sum::<f64>() / 13.0;
        let sigma = (delta.iter().map(|d| (d - mu).powi(2)).sum::<f64>() / 12.0).sqrt();
        let expected = logistic_scale((delta[12] - mu) / sigma);

        let score = institutional_score_from_series(&series);
        assert!((score - expected).abs() < 1e-9);
        assert!(score > 0.0);
    }

    #[test]
    fn test_score_only_reads_requested_symbol() {
        let mut records = weekly("EURUSD", &[0, 10, 0, 10, 0, 40]);
        records.extend(weekly("GBPUSD", &[0, 0, 0, 0, 0, -900]));

        let eur = institutional_score(&records, "EURUSD");
        let expected = institutional_score_from_series(&[0.0, 10.0, 0.0, 10.0, 0.0, 40.0]);
        assert_eq!(eur, expected);
    }
}
