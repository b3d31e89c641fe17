//! Recent-performance scoring parameters.

use super::parse_env;
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Calendar days in the trailing window, counting the latest date.
    pub performance_window_days: u32,
    /// Overall scores at or above this are a Buy.
    pub buy_threshold: u8,
    /// Overall scores at or below this are a Sell.
    pub sell_threshold: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            performance_window_days: 30,
            buy_threshold: 7,
            sell_threshold: 5,
        }
    }
}

impl ScoringConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            performance_window_days: parse_env(
                "PERFORMANCE_WINDOW_DAYS",
                defaults.performance_window_days,
            )?,
            buy_threshold: parse_env("BUY_SCORE_THRESHOLD", defaults.buy_threshold)?,
            sell_threshold: parse_env("SELL_SCORE_THRESHOLD", defaults.sell_threshold)?,
        })
    }
}
