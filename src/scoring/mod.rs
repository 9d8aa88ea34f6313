// Sentiment scoring
// Retail (contrarian) and institutional (COT z-score) legs blended into a NetScore

pub mod institutional;
pub mod retail;

pub use institutional::{institutional_score, institutional_score_from_series};
pub use retail::retail_score;

use crate::models::Direction;
use crate::settings::SettingsError;

/// Minimum weekly rows before the institutional leg is scored
pub const MIN_HISTORY_ROWS: usize = 6;

/// Rolling window (weeks) for the weekly-change z-score
pub const ZSCORE_WINDOW: usize = 13;

/// Weights and thresholds for blending and classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreConfig {
    retail_weight: f64,
    pub long_threshold: f64,
    pub short_threshold: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            retail_weight: 0.6,
            long_threshold: 30.0,
            short_threshold: -30.0,
        }
    }
}

impl ScoreConfig {
    pub fn new(
        retail_weight: f64,
        long_threshold: f64,
        short_threshold: f64,
    ) -> Result<Self, SettingsError> {
        if !(0.0..=1.0).contains(&retail_weight) {
            return Err(SettingsError::RetailWeightOutOfRange(retail_weight));
        }
        if short_threshold > long_threshold {
            return Err(SettingsError::ThresholdsCrossed {
                long: long_threshold,
                short: short_threshold,
            });
        }

        Ok(Self {
            retail_weight,
            long_threshold,
            short_threshold,
        })
    }

    pub fn retail_weight(&self) -> f64 {
        self.retail_weight
    }

    /// Always `1 - retail_weight`
    pub fn institutional_weight(&self) -> f64 {
        1.0 - self.retail_weight
    }

    /// Weighted blend of the two legs
    pub fn net_score(&self, retail: f64, institutional: f64) -> f64 {
        self.retail_weight * retail + self.institutional_weight() * institutional
    }

    /// LONG at or above the long threshold, SHORT at or below the short one
    pub fn direction(&self, net: f64) -> Direction {
        if net >= self.long_threshold {
            Direction::Long
        } else if net <= self.short_threshold {
            Direction::Short
        } else {
            Direction::Flat
        }
    }

    /// Caption shown next to the NetScore chart
    pub fn rules_caption(&self) -> String {
        format!(
            "LONG if Net ≥ {}; SHORT if Net ≤ {}; otherwise FLAT",
            self.long_threshold, self.short_threshold
        )
    }
}
