//! End-to-end orchestration of one analysis run.
//!
//! Stages run strictly in order: validation, features, reduction, clustering,
//! then scoring and per-cluster forecasting on the same assignment.

use crate::application::clustering::{ClusteringOutcome, TimeSeriesClusterer, verify_assignment};
use crate::application::forecasting::ClusterForecaster;
use crate::application::market_data::{FeatureEngineeringService, aggregate_cluster_series};
use crate::application::ml::{DimensionalityReducer, ReductionSummary};
use crate::application::scoring::{ClusterPerformanceScorer, ClusterScore};
use crate::config::PipelineConfig;
use crate::domain::errors::{ConfigurationError, PipelineError};
use crate::domain::types::{
    AssetSeries, ClusterId, ClusterPerformance, ForecastResult, PriceObservation, RawObservation,
    Recommendation,
};
use crate::domain::validation::{DataQualityReport, ObservationValidator};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Everything one run produces, in a form the reporting side can render or
/// serialize directly.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub data_quality: DataQualityReport,
    pub feature_rows: usize,
    pub reduction: ReductionSummary,
    pub clustering: ClusteringOutcome,
    pub performances: Vec<ClusterPerformance>,
    pub scores: Vec<ClusterScore>,
    pub recommendations: Vec<Recommendation>,
    pub empty_clusters: Vec<ClusterId>,
    pub forecasts: BTreeMap<ClusterId, ForecastResult>,
    pub forecast_failures: BTreeMap<ClusterId, String>,
}

impl PipelineReport {
    pub fn recommendation_for(&self, cluster_id: ClusterId) -> Option<&Recommendation> {
        self.recommendations
            .iter()
            .find(|r| r.cluster_id == cluster_id)
    }
}

pub struct AnalysisPipeline {
    config: PipelineConfig,
}

impl AnalysisPipeline {
    /// Validates the configuration up front so a bad parameter fails before
    /// any data is touched.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&self, raw: Vec<RawObservation>) -> Result<PipelineReport, PipelineError> {
        let (observations, quality) = ObservationValidator::validate(raw);
        self.run_observations(observations, quality)
    }

    /// Runs every stage after validation. `quality` collects the stage-local
    /// exclusions on top of whatever validation already recorded.
    pub fn run_observations(
        &self,
        mut observations: Vec<PriceObservation>,
        mut quality: DataQualityReport,
    ) -> Result<PipelineReport, PipelineError> {
        observations.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));

        let features = FeatureEngineeringService::new(self.config.features.clone())
            .compute_all(&observations, &mut quality)?;
        if quality.total_issues() > 0 {
            info!(
                "Data quality: {} issues, {} symbols excluded",
                quality.total_issues(),
                quality.excluded_symbols.len()
            );
        }

        let reduction = DimensionalityReducer::reduce(&features)?;
        let series = AssetSeries::group_by_symbol(reduction.points);

        let clustering = TimeSeriesClusterer::new(self.config.clustering.clone()).cluster(&series)?;
        let symbols: Vec<&str> = series.iter().map(|s| s.symbol.as_str()).collect();
        verify_assignment(&symbols, &clustering.assignment)?;

        let scoring = ClusterPerformanceScorer::new(self.config.scoring.clone())
            .score(&features, &clustering.assignment);

        let cluster_series = aggregate_cluster_series(
            &features,
            &clustering.assignment,
            self.config.forecast.history_cutoff,
        );
        let mut forecasts =
            ClusterForecaster::new(self.config.forecast.clone()).forecast_all(&cluster_series);
        for cluster_id in clustering.assignment.cluster_ids() {
            if !forecasts.forecasts.contains_key(&cluster_id)
                && !forecasts.failures.contains_key(&cluster_id)
            {
                warn!(
                    "Cluster {} has no observations on or after {}",
                    cluster_id, self.config.forecast.history_cutoff
                );
                forecasts.failures.insert(
                    cluster_id,
                    format!(
                        "No observations on or after {}",
                        self.config.forecast.history_cutoff
                    ),
                );
            }
        }

        info!(
            "Run complete: {} clusters, {} recommendations, {} forecasts, {} forecast failures",
            clustering.assignment.k(),
            scoring.recommendations.len(),
            forecasts.forecasts.len(),
            forecasts.failures.len()
        );

        Ok(PipelineReport {
            data_quality: quality,
            feature_rows: features.len(),
            reduction: reduction.summary,
            clustering,
            performances: scoring.performances,
            scores: scoring.scores,
            recommendations: scoring.recommendations,
            empty_clusters: scoring.empty_clusters,
            forecasts: forecasts.forecasts,
            forecast_failures: forecasts.failures,
        })
    }
}
