use std::collections::VecDeque;

use crate::models::IntradayPoint;

/// Samples kept for the intraday retail charts
pub const MAX_INTRADAY_POINTS: usize = 5000;

/// In-memory ring of dashboard samples; oldest entries drop first
#[derive(Debug, Clone)]
pub struct IntradayHistory {
    points: VecDeque<IntradayPoint>,
    capacity: usize,
}

impl IntradayHistory {
    pub fn new() -> Self {
        Self::with_capacity(MAX_INTRADAY_POINTS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.min(MAX_INTRADAY_POINTS)),
            capacity,
        }
    }

    pub fn push_many(&mut self, points: impl IntoIterator<Item = IntradayPoint>) {
        for point in points {
            if self.capacity == 0 {
                return;
            }
            if self.points.len() == self.capacity {
                self.points.pop_front();
            }
            self.points.push_back(point);
        }
    }

    /// Samples for one symbol, oldest first
    pub fn for_symbol(&self, symbol: &str) -> Vec<IntradayPoint> {
        self.points
            .iter()
            .filter(|p| p.symbol == symbol)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Default for IntradayHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn point(symbol: &str, minutes: i64) -> IntradayPoint {
        IntradayPoint {
            timestamp: Utc::now() + Duration::minutes(minutes),
            symbol: symbol.to_string(),
            retail_long_pct: Some(50.0),
            retail_score: 0.0,
            institutional_score: 0.0,
            net_score: minutes as f64,
        }
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut history = IntradayHistory::with_capacity(3);
        history.push_many((0..5).map(|i| point("EURUSD", i)));

        assert_eq!(history.len(), 3);
        let scores: Vec<f64> = history.for_symbol("EURUSD").iter().map(|p| p.net_score).collect();
        assert_eq!(scores, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_for_symbol_filters() {
        let mut history = IntradayHistory::new();
        history.push_many(vec![point("EURUSD", 0), point("GBPUSD", 1), point("EURUSD", 2)]);

        assert_eq!(history.for_symbol("EURUSD").len(), 2);
        assert_eq!(history.for_symbol("GBPUSD").len(), 1);
        assert!(history.for_symbol("US500").is_empty());
    }
}
