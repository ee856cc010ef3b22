//! Median estimator

/// Median of `values`. Even-sized inputs average the two central values.
///
/// Returns `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 != 0 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd() {
        assert_eq!(median(&[100.0, 200.0, 300.0]), Some(200.0));
        assert_eq!(median(&[300.0, 100.0, 200.0]), Some(200.0));
        assert_eq!(median(&[7.0]), Some(7.0));
    }

    #[test]
    fn test_median_even_averages_middle() {
        assert_eq!(median(&[100.0, 200.0, 300.0, 400.0]), Some(250.0));
        assert_eq!(median(&[400.0, 100.0]), Some(250.0));
        assert_eq!(median(&[1.0, 1.0, 5.0, 9.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn test_median_sorts_fractional_gaps() {
        // Differences below 1.0 must still order correctly
        assert_eq!(median(&[1.3, 1.1, 1.2]), Some(1.2));
        assert_eq!(median(&[0.25, 0.5, 0.75, 0.1]), Some(0.375));
    }

    #[test]
    fn test_median_empty() {
        assert_eq!(median(&[]), None);
    }
}
