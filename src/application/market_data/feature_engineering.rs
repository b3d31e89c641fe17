use crate::config::FeatureConfig;
use crate::domain::errors::{ConfigurationError, DataQualityIssue};
use crate::domain::performance::Stats;
use crate::domain::types::{FeatureRow, PriceObservation};
use crate::domain::validation::DataQualityReport;
use std::collections::VecDeque;
use ta::Next;
use ta::indicators::SimpleMovingAverage;
use tracing::{debug, info};

/// Rolling indicator state for one symbol, fed bar by bar in date order.
struct RollingFeatureState {
    ma_short: SimpleMovingAverage,
    ma_long: SimpleMovingAverage,
    short_window: usize,
    long_window: usize,
    volatility_window: usize,
    returns: VecDeque<f64>,
    prev_close: Option<f64>,
    seen: usize,
}

/// Rolling values for one bar. Fields are `None` until their window is full.
struct RollingValues {
    daily_return: Option<f64>,
    volatility: Option<f64>,
    ma_short: Option<f64>,
    ma_long: Option<f64>,
}

impl RollingFeatureState {
    fn new(config: &FeatureConfig) -> Result<Self, ConfigurationError> {
        let sma = |name: &'static str, period: usize| {
            SimpleMovingAverage::new(period).map_err(|e| ConfigurationError::InvalidParameter {
                name,
                reason: format!("{:?}", e),
            })
        };

        Ok(Self {
            ma_short: sma("short_ma_window", config.short_ma_window)?,
            ma_long: sma("long_ma_window", config.long_ma_window)?,
            short_window: config.short_ma_window,
            long_window: config.long_ma_window,
            volatility_window: config.volatility_window,
            returns: VecDeque::with_capacity(config.volatility_window + 1),
            prev_close: None,
            seen: 0,
        })
    }

    fn update(&mut self, close: f64) -> RollingValues {
        self.seen += 1;
        let ma_short = self.ma_short.next(close);
        let ma_long = self.ma_long.next(close);

        let daily_return = self
            .prev_close
            .map(|prev| (close - prev) / prev * 100.0);
        self.prev_close = Some(close);

        if let Some(r) = daily_return {
            self.returns.push_back(r);
            if self.returns.len() > self.volatility_window {
                self.returns.pop_front();
            }
        }

        let volatility = if self.returns.len() == self.volatility_window {
            let window: Vec<f64> = self.returns.iter().copied().collect();
            Some(Stats::sample_std_dev(&window))
        } else {
            None
        };

        RollingValues {
            daily_return,
            volatility,
            ma_short: (self.seen >= self.short_window).then_some(ma_short),
            ma_long: (self.seen >= self.long_window).then_some(ma_long),
        }
    }
}

/// Derives per-symbol daily features from cleaned OHLCV observations.
pub struct FeatureEngineeringService {
    config: FeatureConfig,
}

impl FeatureEngineeringService {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Computes feature rows for one symbol's date-ordered observations.
    ///
    /// Series shorter than `min_observations` yield no rows. Rows whose rolling
    /// windows are not yet full are dropped.
    pub fn compute_symbol(
        &self,
        observations: &[PriceObservation],
    ) -> Result<Vec<FeatureRow>, ConfigurationError> {
        if observations.len() < self.config.min_observations() {
            return Ok(Vec::new());
        }

        let volumes: Vec<f64> = observations.iter().map(|o| o.volume).collect();
        let normalized_volumes = Stats::z_scores(&volumes);

        let mut state = RollingFeatureState::new(&self.config)?;
        let mut rows = Vec::with_capacity(observations.len());

        for (observation, normalized_volume) in observations.iter().zip(normalized_volumes) {
            let values = state.update(observation.close);
            let (Some(daily_return), Some(volatility), Some(ma_short), Some(ma_long)) = (
                values.daily_return,
                values.volatility,
                values.ma_short,
                values.ma_long,
            ) else {
                continue;
            };

            rows.push(FeatureRow {
                symbol: observation.symbol.clone(),
                date: observation.date,
                open: observation.open,
                high: observation.high,
                low: observation.low,
                close: observation.close,
                volume: observation.volume,
                daily_return,
                volatility,
                ma_short,
                ma_long,
                high_low_range: observation.high - observation.low,
                normalized_volume,
            });
        }

        Ok(rows)
    }

    /// Computes feature rows for all symbols. `observations` must be sorted by
    /// (symbol, date), as produced by the observation validator.
    ///
    /// Symbols with too little history are recorded in `report`. Fails only
    /// when no symbol at all produces a row.
    pub fn compute_all(
        &self,
        observations: &[PriceObservation],
        report: &mut DataQualityReport,
    ) -> Result<Vec<FeatureRow>, ConfigurationError> {
        let required = self.config.min_observations();
        let mut rows = Vec::new();
        let mut longest = 0;

        for series in observations.chunk_by(|a, b| a.symbol == b.symbol) {
            let symbol = &series[0].symbol;
            longest = longest.max(series.len());

            let symbol_rows = self.compute_symbol(series)?;
            if symbol_rows.is_empty() {
                report.record(&DataQualityIssue::InsufficientHistory {
                    symbol: symbol.clone(),
                    observations: series.len(),
                    required,
                });
                continue;
            }

            report.warmup_rows_dropped += series.len() - symbol_rows.len();
            debug!(
                "Features for {}: {} of {} observations retained",
                symbol,
                symbol_rows.len(),
                series.len()
            );
            rows.extend(symbol_rows);
        }

        if rows.is_empty() {
            if longest < required {
                return Err(ConfigurationError::WindowExceedsHistory { required, longest });
            }
            return Err(ConfigurationError::NoValidRows);
        }

        info!(
            "Feature engineering produced {} rows ({} warm-up rows dropped, {} symbols excluded)",
            rows.len(),
            report.warmup_rows_dropped,
            report.excluded_symbols.len()
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DataQualityKind;
    use chrono::{Days, NaiveDate};

    fn series(symbol: &str, closes: &[f64]) -> Vec<PriceObservation> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceObservation {
                symbol: symbol.to_string(),
                date: start + Days::new(i as u64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 1_000.0 + (i % 7) as f64 * 10.0,
            })
            .collect()
    }

    fn small_config() -> FeatureConfig {
        FeatureConfig {
            volatility_window: 3,
            short_ma_window: 2,
            long_ma_window: 4,
        }
    }

    #[test]
    fn test_short_series_yields_no_rows() {
        let service = FeatureEngineeringService::new(FeatureConfig::default());
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();

        let rows = service.compute_symbol(&series("BTC", &closes)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_minimum_series_yields_rows() {
        let service = FeatureEngineeringService::new(FeatureConfig::default());
        let closes: Vec<f64> = (0..31).map(|i| 100.0 + i as f64).collect();

        let rows = service.compute_symbol(&series("BTC", &closes)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_rolling_values() {
        let service = FeatureEngineeringService::new(small_config());
        let closes = [100.0, 110.0, 99.0, 99.0, 108.9];

        let rows = service.compute_symbol(&series("ETH", &closes)).unwrap();
        // First full row is index 3: long MA needs 4 closes, volatility 3 returns.
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert!((first.daily_return - 0.0).abs() < 1e-9);
        assert!((first.ma_short - 99.0).abs() < 1e-9);
        assert!((first.ma_long - 102.0).abs() < 1e-9);
        let expected_vol = Stats::sample_std_dev(&[10.0, -10.0, 0.0]);
        assert!((first.volatility - expected_vol).abs() < 1e-9);

        let second = &rows[1];
        assert!((second.daily_return - 10.0).abs() < 1e-9);
        assert!((second.high_low_range - 108.9 * 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_compute_all_reports_short_symbols() {
        let service = FeatureEngineeringService::new(small_config());
        let mut observations = series("ADA", &[1.0, 1.1]);
        observations.extend(series("BTC", &[100.0, 101.0, 102.0, 101.0, 103.0, 104.0]));

        let mut report = DataQualityReport::default();
        let rows = service.compute_all(&observations, &mut report).unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.symbol == "BTC"));
        assert_eq!(report.count(DataQualityKind::InsufficientHistory), 1);
        assert!(report.excluded_symbols.contains("ADA"));
        assert_eq!(report.warmup_rows_dropped, 3);
    }

    #[test]
    fn test_compute_all_window_exceeds_history() {
        let service = FeatureEngineeringService::new(FeatureConfig::default());
        let observations = series("BTC", &[100.0, 101.0, 102.0]);

        let mut report = DataQualityReport::default();
        let err = service.compute_all(&observations, &mut report).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::WindowExceedsHistory {
                required: 31,
                longest: 3
            }
        );
    }
}
