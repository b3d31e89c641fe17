//! Configuration module for the cluster analysis pipeline.
//!
//! Parameters are grouped by stage: Features, Clustering, Scoring and Forecast.
//! Each group loads from environment variables or from a TOML file.

mod clustering_config;
mod feature_config;
mod forecast_config;
mod scoring_config;

pub use clustering_config::ClusteringConfig;
pub use feature_config::FeatureConfig;
pub use forecast_config::ForecastConfig;
pub use scoring_config::ScoringConfig;

use crate::domain::errors::ConfigurationError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

/// Lowest and highest possible overall score with three tiered metrics.
const MIN_OVERALL_SCORE: u8 = 3;
const MAX_OVERALL_SCORE: u8 = 9;

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub features: FeatureConfig,
    pub clustering: ClusteringConfig,
    pub scoring: ScoringConfig,
    pub forecast: ForecastConfig,
}

impl PipelineConfig {
    /// Loads every stage from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            features: FeatureConfig::from_env()?,
            clustering: ClusteringConfig::from_env()?,
            scoring: ScoringConfig::from_env()?,
            forecast: ForecastConfig::from_env()?,
        })
    }

    /// Loads a configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read pipeline config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .context(format!("Failed to parse pipeline config TOML: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Rejects parameter combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |name: &'static str, reason: String| {
            Err(ConfigurationError::InvalidParameter { name, reason })
        };

        if self.clustering.k < 1 {
            return invalid("k", "must be at least 1".to_string());
        }
        if self.clustering.max_iterations < 1 {
            return invalid("max_iterations", "must be at least 1".to_string());
        }
        // A single return has no sample stdev.
        if self.features.volatility_window < 2 {
            return invalid(
                "volatility_window",
                format!("{} < 2", self.features.volatility_window),
            );
        }
        if self.features.short_ma_window < 1 {
            return invalid("short_ma_window", "must be at least 1".to_string());
        }
        if self.features.short_ma_window >= self.features.long_ma_window {
            return invalid(
                "short_ma_window",
                format!(
                    "short window {} must be below long window {}",
                    self.features.short_ma_window, self.features.long_ma_window
                ),
            );
        }
        if self.scoring.performance_window_days < 1 {
            return invalid("performance_window_days", "must be at least 1".to_string());
        }
        let score_range = MIN_OVERALL_SCORE..=MAX_OVERALL_SCORE;
        if !score_range.contains(&self.scoring.buy_threshold)
            || !score_range.contains(&self.scoring.sell_threshold)
        {
            return invalid(
                "thresholds",
                format!(
                    "buy {} and sell {} must lie in {}..={}",
                    self.scoring.buy_threshold,
                    self.scoring.sell_threshold,
                    MIN_OVERALL_SCORE,
                    MAX_OVERALL_SCORE
                ),
            );
        }
        if self.scoring.sell_threshold >= self.scoring.buy_threshold {
            return invalid(
                "sell_threshold",
                format!(
                    "sell {} must be below buy {}",
                    self.scoring.sell_threshold, self.scoring.buy_threshold
                ),
            );
        }
        if self.forecast.horizon < 1 {
            return invalid("horizon", "must be at least 1".to_string());
        }
        if self.forecast.seasonal_period < 1 {
            return invalid("seasonal_period", "must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Parses an environment variable, using `default` when it is unset.
pub(crate) fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}
