//! Forecast horizon and automatic ARIMA search bounds.

use super::parse_env;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Future daily steps to forecast.
    pub horizon: usize,
    /// Only cluster means on or after this date are modelled.
    pub history_cutoff: NaiveDate,
    pub seasonal_period: usize,
    pub max_p: usize,
    pub max_q: usize,
    pub max_d: usize,
    /// Stepwise search instead of the full (p, q) grid.
    pub stepwise: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 180,
            history_cutoff: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or_default(),
            seasonal_period: 365,
            max_p: 5,
            max_q: 5,
            max_d: 2,
            stepwise: true,
        }
    }
}

impl ForecastConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let history_cutoff = match env::var("FORECAST_CUTOFF") {
            Ok(value) => NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                .context(format!("Invalid FORECAST_CUTOFF date: {}", value))?,
            Err(_) => defaults.history_cutoff,
        };

        Ok(Self {
            horizon: parse_env("FORECAST_HORIZON", defaults.horizon)?,
            history_cutoff,
            seasonal_period: parse_env("SEASONAL_PERIOD", defaults.seasonal_period)?,
            max_p: parse_env("ARIMA_MAX_P", defaults.max_p)?,
            max_q: parse_env("ARIMA_MAX_Q", defaults.max_q)?,
            max_d: parse_env("ARIMA_MAX_D", defaults.max_d)?,
            stepwise: parse_env("ARIMA_STEPWISE", defaults.stepwise)?,
        })
    }
}
