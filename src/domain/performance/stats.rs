use statrs::statistics::{Data, Distribution};

/// Shared statistics utilities for return series.
pub struct Stats;

impl Stats {
    /// Arithmetic mean. `None` for an empty slice.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Data::new(values.to_vec()).mean()
    }

    /// Sample standard deviation (n-1 denominator).
    ///
    /// Returns 0.0 for fewer than two values, where it is undefined.
    pub fn sample_std_dev(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        Data::new(values.to_vec()).std_dev().unwrap_or(0.0)
    }

    /// Compounds percent returns: product of (1 + r/100), minus one.
    pub fn compounded_return(pct_returns: &[f64]) -> f64 {
        pct_returns
            .iter()
            .fold(1.0, |acc, r| acc * (1.0 + r / 100.0))
            - 1.0
    }

    /// Z-scores against the slice's own mean and sample stdev.
    ///
    /// A zero-dispersion slice maps to all zeros.
    pub fn z_scores(values: &[f64]) -> Vec<f64> {
        let mean = Self::mean(values).unwrap_or(0.0);
        let std_dev = Self::sample_std_dev(values);
        if std_dev <= f64::EPSILON {
            return vec![0.0; values.len()];
        }
        values.iter().map(|v| (v - mean) / std_dev).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // population stdev is 2.0, sample stdev is sqrt(32/7)
        let expected = (32.0f64 / 7.0).sqrt();
        assert!((Stats::sample_std_dev(&values) - expected).abs() < 1e-12);
        assert_eq!(Stats::sample_std_dev(&[1.0]), 0.0);
    }

    #[test]
    fn test_compounding() {
        // +10% then -10% loses 1%
        assert!((Stats::compounded_return(&[10.0, -10.0]) + 0.01).abs() < 1e-12);
        assert_eq!(Stats::compounded_return(&[]), 0.0);
    }

    #[test]
    fn test_z_scores_constant_input() {
        assert_eq!(Stats::z_scores(&[3.0, 3.0, 3.0]), vec![0.0, 0.0, 0.0]);

        let z = Stats::z_scores(&[1.0, 2.0, 3.0]);
        assert!((z[0] + 1.0).abs() < 1e-12);
        assert!(z[1].abs() < 1e-12);
    }
}
