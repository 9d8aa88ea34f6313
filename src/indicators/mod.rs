// Statistics used by the scoring module
// Rolling mean/std, first differences, z-score and logistic squashing

pub mod moving_average;
pub mod zscore;

pub use moving_average::{calculate_mean, calculate_rolling_std, calculate_sma, calculate_std};
pub use zscore::{calculate_diff, calculate_zscore, logistic_scale};
