//! Differencing and unit-root checks used to pick the integration orders.

use crate::domain::performance::Stats;

/// 5% critical value of the KPSS level-stationarity statistic.
pub const KPSS_CRITICAL_5PCT: f64 = 0.463;

/// Seasonal strength above which one seasonal difference is taken.
pub const SEASONAL_STRENGTH_THRESHOLD: f64 = 0.64;

/// Shortest series the KPSS statistic is computed on.
const KPSS_MIN_LEN: usize = 10;

/// Lag-`lag` difference: `x[t] - x[t - lag]`.
pub fn difference(values: &[f64], lag: usize) -> Vec<f64> {
    if lag == 0 || values.len() <= lag {
        return Vec::new();
    }
    values
        .iter()
        .skip(lag)
        .zip(values.iter())
        .map(|(x, prev)| x - prev)
        .collect()
}

/// Applies `d` first differences.
pub fn difference_n(values: &[f64], d: usize) -> Vec<f64> {
    let mut result = values.to_vec();
    for _ in 0..d {
        result = difference(&result, 1);
    }
    result
}

/// KPSS statistic for level stationarity with a Newey-West long-run
/// variance, lag `trunc(4 (n/100)^0.25)`.
///
/// A series without variance is stationary and scores 0.
pub fn kpss_statistic(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let mean = Stats::mean(values).unwrap_or(0.0);
    let demeaned: Vec<f64> = values.iter().map(|v| v - mean).collect();

    let lag = ((4.0 * (n as f64 / 100.0).powf(0.25)) as usize).min(n - 1);
    let mut s2 = demeaned.iter().map(|e| e * e).sum::<f64>() / n as f64;
    for l in 1..=lag {
        let weight = 1.0 - l as f64 / (lag + 1) as f64;
        let gamma = demeaned[l..]
            .iter()
            .zip(&demeaned[..n - l])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        s2 += 2.0 * weight * gamma;
    }
    if s2 <= f64::EPSILON {
        return 0.0;
    }

    let mut partial = 0.0;
    let sum_sq: f64 = demeaned
        .iter()
        .map(|e| {
            partial += e;
            partial * partial
        })
        .sum();
    sum_sq / (n as f64 * n as f64 * s2)
}

/// Number of first differences (at most `max_d`) needed before the KPSS test
/// no longer rejects level stationarity.
pub fn ndiffs(values: &[f64], max_d: usize) -> usize {
    let mut series = values.to_vec();
    let mut d = 0;
    while d < max_d && series.len() >= KPSS_MIN_LEN && kpss_statistic(&series) > KPSS_CRITICAL_5PCT {
        series = difference(&series, 1);
        d += 1;
    }
    d
}

/// Centred moving average of `period` points. Even periods use the 2xm
/// average. Positions without a full window are `None`.
fn centred_moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let half = period / 2;
    let mut trend = vec![None; n];
    if n < period + (period + 1) % 2 {
        return trend;
    }

    for (t, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
        *slot = if period % 2 == 1 {
            Some(values[t - half..=t + half].iter().sum::<f64>() / period as f64)
        } else {
            let inner: f64 = values[t - half + 1..t + half].iter().sum();
            let edges = 0.5 * (values[t - half] + values[t + half]);
            Some((inner + edges) / period as f64)
        };
    }
    trend
}

/// Strength of seasonality `max(0, 1 - Var(R) / Var(S + R))` from a classical
/// additive decomposition with the given period.
pub fn seasonal_strength(values: &[f64], period: usize) -> f64 {
    if period < 2 || values.len() < 2 * period {
        return 0.0;
    }
    let trend = centred_moving_average(values, period);

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (t, level) in trend.iter().enumerate() {
        if let Some(level) = level {
            sums[t % period] += values[t] - level;
            counts[t % period] += 1;
        }
    }
    let raw: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let offset = Stats::mean(&raw).unwrap_or(0.0);

    let mut remainder = Vec::new();
    let mut detrended = Vec::new();
    for (t, level) in trend.iter().enumerate() {
        if let Some(level) = level {
            let d = values[t] - level;
            detrended.push(d);
            remainder.push(d - (raw[t % period] - offset));
        }
    }

    let var_detrended = Stats::sample_std_dev(&detrended).powi(2);
    if var_detrended <= f64::EPSILON {
        return 0.0;
    }
    let var_remainder = Stats::sample_std_dev(&remainder).powi(2);
    (1.0 - var_remainder / var_detrended).max(0.0)
}

/// Seasonal differences (0 or 1) to take. Needs two full periods of data.
pub fn nsdiffs(values: &[f64], period: usize) -> usize {
    if period < 2 || values.len() < 2 * period {
        return 0;
    }
    usize::from(seasonal_strength(values, period) > SEASONAL_STRENGTH_THRESHOLD)
}
