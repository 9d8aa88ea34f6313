/// Consecutive differences: `out[i] = values[i + 1] - values[i]`
pub fn calculate_diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Standard score of `value`; None when sigma is zero or not finite
pub fn calculate_zscore(value: f64, mean: f64, std: f64) -> Option<f64> {
    if std == 0.0 || !std.is_finite() || !mean.is_finite() {
        return None;
    }
    Some((value - mean) / std)
}

/// Map a z-score onto [-100, 100] with a logistic curve
///
/// `100 * (2 / (1 + e^-z) - 1)`: 0 maps to 0, +/-inf saturates at +/-100
pub fn logistic_scale(z: f64) -> f64 {
    let scaled = 100.0 * (2.0 / (1.0 + (-z).exp()) - 1.0);
    scaled.clamp(-100.0, 100.0)
}
