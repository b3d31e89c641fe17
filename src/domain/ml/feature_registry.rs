use crate::domain::types::FeatureRow;

/// Ordered list of the numeric feature columns fed to the dimensionality reducer.
/// The order is fixed at the schema level; `features_to_f64_vector` follows it.
pub const FEATURE_NAMES: &[&str] = &[
    "open",
    "high",
    "low",
    "close",
    "volume",
    "daily_return",
    "volatility",
    "ma_short",
    "ma_long",
    "high_low_range",
    "normalized_volume",
];

/// Converts a feature row into its numeric vector, in `FEATURE_NAMES` order.
pub fn features_to_f64_vector(row: &FeatureRow) -> Vec<f64> {
    vec![
        row.open,
        row.high,
        row.low,
        row.close,
        row.volume,
        row.daily_return,
        row.volatility,
        row.ma_short,
        row.ma_long,
        row.high_low_range,
        row.normalized_volume,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_feature_vector_matches_registry() {
        let row = FeatureRow {
            symbol: "BTC".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 10.0,
            daily_return: 0.1,
            volatility: 0.2,
            ma_short: 1.4,
            ma_long: 1.3,
            high_low_range: 1.5,
            normalized_volume: -0.7,
        };

        let vec = features_to_f64_vector(&row);
        assert_eq!(vec.len(), FEATURE_NAMES.len());
        // open is index 0, normalized_volume is the last index
        assert_eq!(vec[0], 1.0);
        assert_eq!(vec[10], -0.7);
    }
}
