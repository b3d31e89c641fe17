//! Shape-based clustering parameters.

use super::parse_env;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Number of clusters.
    pub k: usize,
    /// Seed for the initial medoid draw.
    pub seed: u64,
    pub max_iterations: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            k: 3,
            seed: 2024,
            max_iterations: 100,
        }
    }
}

impl ClusteringConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            k: parse_env("CLUSTER_COUNT", defaults.k)?,
            seed: parse_env("CLUSTER_SEED", defaults.seed)?,
            max_iterations: parse_env("CLUSTER_MAX_ITERATIONS", defaults.max_iterations)?,
        })
    }
}
