//! Feature engineering windows.

use super::parse_env;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Trailing window of the return stdev.
    pub volatility_window: usize,
    pub short_ma_window: usize,
    pub long_ma_window: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            volatility_window: 10,
            short_ma_window: 10,
            long_ma_window: 30,
        }
    }
}

impl FeatureConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            volatility_window: parse_env("VOLATILITY_WINDOW", defaults.volatility_window)?,
            short_ma_window: parse_env("MA_SHORT_WINDOW", defaults.short_ma_window)?,
            long_ma_window: parse_env("MA_LONG_WINDOW", defaults.long_ma_window)?,
        })
    }

    /// Observations a symbol needs before it can yield any feature row.
    pub fn min_observations(&self) -> usize {
        self.volatility_window
            .max(self.short_ma_window)
            .max(self.long_ma_window)
            + 1
    }
}
