/// Contrarian retail score on [-100, 100]
///
/// The crowd being 50% long scores 0; every point above 50 subtracts two.
/// `None` (no outlook for the symbol) is neutral.
pub fn retail_score(avg_long: Option<f64>) -> f64 {
    match avg_long {
        Some(long_pct) => (-2.0 * (long_pct - 50.0)).clamp(-100.0, 100.0),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retail_score_is_contrarian() {
        assert_eq!(retail_score(Some(50.0)), 0.0);
        assert_eq!(retail_score(Some(75.0)), -50.0);
        assert_eq!(retail_score(Some(20.0)), 60.0);
    }

    #[test]
    fn test_retail_score_clamped() {
        assert_eq!(retail_score(Some(100.0)), -100.0);
        assert_eq!(retail_score(Some(0.0)), 100.0);
        assert_eq!(retail_score(Some(140.0)), -100.0);
    }

    #[test]
    fn test_missing_outlook_is_neutral() {
        assert_eq!(retail_score(None), 0.0);
    }
}
