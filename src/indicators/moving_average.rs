/// Simple Moving Average over the last `period` values
pub fn calculate_sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let sum: f64 = values.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Mean of the whole slice
pub fn calculate_mean(values: &[f64]) -> Option<f64> {
    calculate_sma(values, values.len())
}

/// Standard deviation with `ddof` delta degrees of freedom
///
/// - `ddof = 0`: population std
/// - `ddof = 1`: sample std
///
/// Returns None when `values.len() <= ddof`
pub fn calculate_std(values: &[f64], ddof: usize) -> Option<f64> {
    if values.is_empty() || values.len() <= ddof {
        return None;
    }

    let mean = calculate_mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((sum_sq / (values.len() - ddof) as f64).sqrt())
}

/// Sample std (ddof 1) over the last `period` values
pub fn calculate_rolling_std(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    calculate_std(&values[values.len() - period..], 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let values = vec![100.0, 102.0, 104.0, 106.0, 108.0];
        assert_eq!(calculate_sma(&values, 5), Some(104.0));
        assert_eq!(calculate_sma(&values, 2), Some(107.0));
    }

    #[test]
    fn test_sma_insufficient_data() {
        let values = vec![100.0, 102.0];
        assert!(calculate_sma(&values, 5).is_none());
        assert!(calculate_mean(&[]).is_none());
    }

    #[test]
    fn test_population_vs_sample_std() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        let population = calculate_std(&values, 0).unwrap();
        assert!((population - 2.0).abs() < 1e-12);

        let sample = calculate_std(&values, 1).unwrap();
        assert!((sample - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_std_undefined_for_single_sample() {
        assert_eq!(calculate_std(&[3.0], 0), Some(0.0));
        assert!(calculate_std(&[3.0], 1).is_none());
    }

    #[test]
    fn test_rolling_std_uses_tail() {
        let values = vec![1000.0, 1.0, 2.0, 3.0];
        let std = calculate_rolling_std(&values, 3).unwrap();
        assert!((std - 1.0).abs() < 1e-12);
    }
}
