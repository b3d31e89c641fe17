use super::auto_arima::{AutoArima, MIN_OBSERVATIONS};
use crate::config::ForecastConfig;
use crate::domain::errors::ModelFitError;
use crate::domain::types::{ClusterId, ClusterTimeSeries, ForecastPoint, ForecastResult};
use rayon::prelude::*;
use serde::Serialize;
use statrs::function::erf::erf_inv;
use std::collections::BTreeMap;
use tracing::{error, info};

/// Standard normal quantile.
pub fn normal_quantile(p: f64) -> f64 {
    std::f64::consts::SQRT_2 * erf_inv(2.0 * p - 1.0)
}

/// Per-cluster forecasts. A cluster whose model cannot be fitted appears in
/// `failures` instead of `forecasts`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ForecastOutcome {
    pub forecasts: BTreeMap<ClusterId, ForecastResult>,
    pub failures: BTreeMap<ClusterId, String>,
}

pub struct ClusterForecaster {
    config: ForecastConfig,
    search: AutoArima,
}

impl ClusterForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        let search = AutoArima::from_config(&config);
        Self { config, search }
    }

    /// Fits a model to one cluster series and projects `horizon` calendar
    /// days past its last date with 80% and 95% intervals.
    pub fn forecast_series(
        &self,
        series: &ClusterTimeSeries,
    ) -> Result<ForecastResult, ModelFitError> {
        let Some(last_date) = series.last_date() else {
            return Err(ModelFitError::SeriesTooShort {
                len: 0,
                required: MIN_OBSERVATIONS,
            });
        };

        let model = self.search.fit(&series.values())?;
        let forecast = model.forecast(self.config.horizon)?;

        let z80 = normal_quantile(0.90);
        let z95 = normal_quantile(0.975);
        let points: Vec<ForecastPoint> = last_date
            .iter_days()
            .skip(1)
            .zip(forecast.mean.iter().zip(&forecast.std_error))
            .map(|(date, (&mean, &se))| ForecastPoint {
                date,
                point_forecast: mean,
                lower_80: mean - z80 * se,
                upper_80: mean + z80 * se,
                lower_95: mean - z95 * se,
                upper_95: mean + z95 * se,
            })
            .collect();

        let summary = model.summary();
        info!(
            "Cluster {}: {} on {} points, AICc {:.2}, {} days forecast",
            series.cluster_id,
            summary,
            series.points.len(),
            summary.aicc,
            points.len()
        );

        Ok(ForecastResult {
            cluster_id: series.cluster_id,
            model: summary,
            points,
        })
    }

    /// Forecasts every cluster in parallel. Failures are isolated per cluster.
    pub fn forecast_all(&self, series: &[ClusterTimeSeries]) -> ForecastOutcome {
        let results: Vec<(ClusterId, Result<ForecastResult, ModelFitError>)> = series
            .par_iter()
            .map(|s| (s.cluster_id, self.forecast_series(s)))
            .collect();

        let mut outcome = ForecastOutcome::default();
        for (cluster_id, result) in results {
            match result {
                Ok(forecast) => {
                    outcome.forecasts.insert(cluster_id, forecast);
                }
                Err(e) => {
                    error!("Forecast for cluster {} failed: {}", cluster_id, e);
                    outcome.failures.insert(cluster_id, e.to_string());
                }
            }
        }
        outcome
    }
}
