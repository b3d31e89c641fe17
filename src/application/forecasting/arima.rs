//! Seasonal-differenced ARIMA models estimated by Hannan-Rissanen regression.

use super::stationarity::{difference, difference_n};
use crate::domain::errors::ModelFitError;
use crate::domain::performance::Stats;
use crate::domain::types::ModelSummary;
use nalgebra::{DMatrix, DVector};

/// Observations left over after the lags, on the differenced scale.
const MIN_RESIDUAL_DOF: usize = 10;

/// Reflection coefficients this close to 1 count as a unit root.
const UNIT_ROOT_TOLERANCE: f64 = 1e-3;

const SIGMA2_FLOOR: f64 = 1e-12;
const SVD_EPS: f64 = 1e-12;

/// Model orders. Only seasonal differencing is supported on the seasonal side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArimaSpec {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_d: usize,
    pub period: usize,
    pub include_constant: bool,
}

impl ArimaSpec {
    /// Coefficients of `(1 - B)^d (1 - B^m)^D`, indexed by power of B.
    pub fn differencing_polynomial(&self) -> Vec<f64> {
        let mut poly = vec![1.0];
        for _ in 0..self.d {
            poly = poly_mul(&poly, &[1.0, -1.0]);
        }
        if self.period > 0 {
            let mut seasonal = vec![0.0; self.period + 1];
            seasonal[0] = 1.0;
            seasonal[self.period] = -1.0;
            for _ in 0..self.seasonal_d {
                poly = poly_mul(&poly, &seasonal);
            }
        }
        poly
    }

    /// Applies the seasonal differences, then the regular ones.
    pub fn difference(&self, values: &[f64]) -> Vec<f64> {
        let mut result = values.to_vec();
        for _ in 0..self.seasonal_d {
            result = difference(&result, self.period);
        }
        difference_n(&result, self.d)
    }

    /// Observations consumed by differencing.
    pub fn lag_span(&self) -> usize {
        self.d + self.seasonal_d * self.period
    }

    fn inadmissible(&self, reason: impl Into<String>) -> ModelFitError {
        ModelFitError::Inadmissible {
            p: self.p,
            d: self.d,
            q: self.q,
            reason: reason.into(),
        }
    }
}

/// Point forecasts with their standard errors, one per step ahead.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub mean: Vec<f64>,
    pub std_error: Vec<f64>,
}

/// A fitted model, holding the history it needs to forecast.
#[derive(Debug, Clone)]
pub struct ArimaModel {
    pub spec: ArimaSpec,
    /// AR coefficients of `1 - sum(phi_i B^i)`.
    pub ar: Vec<f64>,
    /// MA coefficients of `1 + sum(theta_j B^j)`.
    pub ma: Vec<f64>,
    /// Mean of the differenced series; zero without a constant.
    pub mean: f64,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aicc: f64,
    history: Vec<f64>,
    centred: Vec<f64>,
    residuals: Vec<f64>,
}

impl ArimaModel {
    pub fn fit(series: &[f64], spec: ArimaSpec) -> Result<Self, ModelFitError> {
        if series.iter().any(|v| !v.is_finite()) {
            return Err(ModelFitError::NonFiniteValues);
        }

        let constant = usize::from(spec.include_constant);
        let required = spec.p + spec.q + constant + MIN_RESIDUAL_DOF;
        let differenced = spec.difference(series);
        if differenced.len() < required {
            return Err(ModelFitError::SeriesTooShort {
                len: series.len(),
                required: required + spec.lag_span(),
            });
        }

        let mean = if spec.include_constant {
            Stats::mean(&differenced).unwrap_or(0.0)
        } else {
            0.0
        };
        let centred: Vec<f64> = differenced.iter().map(|v| v - mean).collect();

        let (ar, ma) =
            hannan_rissanen(&centred, spec.p, spec.q).map_err(|r| spec.inadmissible(r))?;
        if !is_stationary(&ar) {
            return Err(spec.inadmissible("AR part is not stationary"));
        }
        let negated_ma: Vec<f64> = ma.iter().map(|t| -t).collect();
        if !is_stationary(&negated_ma) {
            return Err(spec.inadmissible("MA part is not invertible"));
        }

        let residuals = css_residuals(&centred, &ar, &ma);
        let n_eff = centred.len() - spec.p;
        let sse: f64 = residuals[spec.p..].iter().map(|e| e * e).sum();
        let sigma2 = (sse / n_eff as f64).max(SIGMA2_FLOOR);

        let k = spec.p + spec.q + constant + 1;
        if n_eff <= k + 1 {
            return Err(ModelFitError::SeriesTooShort {
                len: series.len(),
                required: k + 2 + spec.p + spec.lag_span(),
            });
        }
        let n = n_eff as f64;
        let log_likelihood = -0.5 * n * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let kf = k as f64;
        let aicc = -2.0 * log_likelihood + 2.0 * kf + 2.0 * kf * (kf + 1.0) / (n - kf - 1.0);
        if !aicc.is_finite() {
            return Err(spec.inadmissible("information criterion is not finite"));
        }

        Ok(Self {
            spec,
            ar,
            ma,
            mean,
            sigma2,
            log_likelihood,
            aicc,
            history: series.to_vec(),
            centred,
            residuals,
        })
    }

    /// MA(infinity) weights of the integrated model, `psi_0 = 1`.
    pub fn psi_weights(&self, count: usize) -> Vec<f64> {
        let mut ar_poly = Vec::with_capacity(self.ar.len() + 1);
        ar_poly.push(1.0);
        ar_poly.extend(self.ar.iter().map(|phi| -phi));
        let full = poly_mul(&ar_poly, &self.spec.differencing_polynomial());

        let mut psi = Vec::with_capacity(count);
        for j in 0..count {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut value = self.ma.get(j - 1).copied().unwrap_or(0.0);
            for k in 1..full.len().min(j + 1) {
                value -= full[k] * psi[j - k];
            }
            psi.push(value);
        }
        psi
    }

    /// Forecasts `horizon` steps past the end of the fitted series.
    pub fn forecast(&self, horizon: usize) -> Result<Forecast, ModelFitError> {
        let mut z = self.centred.clone();
        let mut e = self.residuals.clone();
        let mut future = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let n = z.len();
            let mut value = 0.0;
            for (i, phi) in self.ar.iter().enumerate() {
                value += phi * z[n - 1 - i];
            }
            for (j, theta) in self.ma.iter().enumerate() {
                if n > j {
                    value += theta * e[n - 1 - j];
                }
            }
            z.push(value);
            e.push(0.0);
            future.push(value + self.mean);
        }

        let delta = self.spec.differencing_polynomial();
        let mut levels = self.history.clone();
        let mut mean = Vec::with_capacity(horizon);
        for w in future {
            let t = levels.len();
            let mut value = w;
            for (k, coefficient) in delta.iter().enumerate().skip(1) {
                value -= coefficient * levels[t - k];
            }
            levels.push(value);
            mean.push(value);
        }

        let mut cumulative = 0.0;
        let std_error: Vec<f64> = self
            .psi_weights(horizon)
            .iter()
            .map(|psi| {
                cumulative += psi * psi;
                (self.sigma2 * cumulative).sqrt()
            })
            .collect();

        if mean.iter().chain(&std_error).any(|v| !v.is_finite()) {
            return Err(ModelFitError::NonFiniteForecast);
        }
        Ok(Forecast { mean, std_error })
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            p: self.spec.p,
            d: self.spec.d,
            q: self.spec.q,
            seasonal_d: self.spec.seasonal_d,
            period: self.spec.period,
            include_constant: self.spec.include_constant,
            aicc: self.aicc,
            sigma2: self.sigma2,
        }
    }
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Checks that `1 - sum(phi_i B^i)` has all roots outside the unit circle,
/// by stepping the Levinson-Durbin recursion down to the partial
/// autocorrelations.
pub fn is_stationary(phi: &[f64]) -> bool {
    let mut a = phi.to_vec();
    while let Some(&k) = a.last() {
        if !k.is_finite() || k.abs() >= 1.0 - UNIT_ROOT_TOLERANCE {
            return false;
        }
        let m = a.len();
        let denom = 1.0 - k * k;
        a = (0..m - 1).map(|i| (a[i] + k * a[m - 2 - i]) / denom).collect();
    }
    true
}

/// Least squares of `z[t]` on `p` lags of `z` and `q` lags of `e`, over
/// `t in start..n`.
fn lagged_regression(
    z: &[f64],
    e: &[f64],
    p: usize,
    q: usize,
    start: usize,
) -> Result<Vec<f64>, String> {
    let n = z.len();
    let cols = p + q;
    if start >= n || n - start <= cols {
        return Err(format!(
            "{} rows cannot identify {} coefficients",
            n.saturating_sub(start),
            cols
        ));
    }

    let rows = n - start;
    let mut x_data = Vec::with_capacity(rows * cols);
    for t in start..n {
        x_data.extend((1..=p).map(|i| z[t - i]));
        x_data.extend((1..=q).map(|j| e[t - j]));
    }
    let x = DMatrix::from_row_slice(rows, cols, &x_data);
    let y = DVector::from_column_slice(&z[start..]);

    let beta = x
        .svd(true, true)
        .solve(&y, SVD_EPS)
        .map_err(|err| format!("least squares failed: {}", err))?;
    Ok(beta.iter().copied().collect())
}

/// Two-step Hannan-Rissanen: innovations from a long AR fit, then one
/// regression on lagged values and lagged innovations.
fn hannan_rissanen(z: &[f64], p: usize, q: usize) -> Result<(Vec<f64>, Vec<f64>), String> {
    if p == 0 && q == 0 {
        return Ok((Vec::new(), Vec::new()));
    }
    if q == 0 {
        return Ok((lagged_regression(z, &[], p, 0, p)?, Vec::new()));
    }

    let n = z.len();
    let long = ((10.0 * (n as f64).log10()).ceil() as usize)
        .max(p + q)
        .min(n / 4)
        .max(1);
    let long_ar = lagged_regression(z, &[], long, 0, long)?;

    let mut innovations = vec![0.0; n];
    for t in long..n {
        let fitted: f64 = long_ar.iter().enumerate().map(|(i, a)| a * z[t - 1 - i]).sum();
        innovations[t] = z[t] - fitted;
    }

    let beta = lagged_regression(z, &innovations, p, q, p.max(long + q))?;
    let (ar, ma) = beta.split_at(p);
    Ok((ar.to_vec(), ma.to_vec()))
}

/// Conditional residuals. The first `p` are zero.
fn css_residuals(z: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut e = vec![0.0; z.len()];
    for t in p..z.len() {
        let mut value = z[t];
        for (i, phi) in ar.iter().enumerate() {
            value -= phi * z[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t >= p + j + 1 {
                value -= theta * e[t - 1 - j];
            }
        }
        e[t] = value;
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn spec(p: usize, d: usize, q: usize, include_constant: bool) -> ArimaSpec {
        ArimaSpec {
            p,
            d,
            q,
            seasonal_d: 0,
            period: 365,
            include_constant,
        }
    }

    fn shocks(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.random_range(-1.0..1.0)).collect()
    }

    #[test]
    fn test_differencing_polynomial() {
        let spec = ArimaSpec {
            p: 0,
            d: 1,
            q: 0,
            seasonal_d: 1,
            period: 4,
            include_constant: false,
        };
        assert_eq!(
            spec.differencing_polynomial(),
            vec![1.0, -1.0, 0.0, 0.0, -1.0, 1.0]
        );
        assert_eq!(spec.lag_span(), 5);
    }

    #[test]
    fn test_stationarity_check() {
        assert!(is_stationary(&[]));
        assert!(is_stationary(&[0.5]));
        assert!(!is_stationary(&[1.2]));
        assert!(is_stationary(&[0.5, 0.3]));
        assert!(!is_stationary(&[0.5, 0.6]));
    }

    #[test]
    fn test_ar1_recovery() {
        let eps = shocks(600, 3);
        let mut x = vec![0.0];
        for t in 1..eps.len() {
            x.push(5.0 + 0.7 * (x[t - 1] - 5.0) + eps[t]);
        }

        let model = ArimaModel::fit(&x, spec(1, 0, 0, true)).unwrap();
        assert!((model.ar[0] - 0.7).abs() < 0.1);
        assert!((model.mean - 5.0).abs() < 1.0);
    }

    #[test]
    fn test_arma11_recovery() {
        let eps = shocks(3000, 5);
        let mut x = vec![0.0];
        for t in 1..eps.len() {
            x.push(0.5 * x[t - 1] + eps[t] + 0.4 * eps[t - 1]);
        }

        let model = ArimaModel::fit(&x, spec(1, 0, 1, false)).unwrap();
        assert!((model.ar[0] - 0.5).abs() < 0.15);
        assert!((model.ma[0] - 0.4).abs() < 0.15);
    }

    #[test]
    fn test_random_walk_forecast() {
        let mut level = 100.0;
        let walk: Vec<f64> = shocks(200, 9)
            .into_iter()
            .map(|s| {
                level += s;
                level
            })
            .collect();

        let model = ArimaModel::fit(&walk, spec(0, 1, 0, false)).unwrap();
        let forecast = model.forecast(4).unwrap();

        let last = *walk.last().unwrap();
        assert!(forecast.mean.iter().all(|m| (m - last).abs() < 1e-9));
        assert!((forecast.std_error[3] / forecast.std_error[0] - 2.0).abs() < 1e-9);
        assert_eq!(model.psi_weights(3), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_drift_is_extrapolated() {
        let trend: Vec<f64> = shocks(300, 13)
            .iter()
            .enumerate()
            .map(|(t, s)| 10.0 + 0.5 * t as f64 + 0.1 * s)
            .collect();

        let model = ArimaModel::fit(&trend, spec(0, 1, 0, true)).unwrap();
        let forecast = model.forecast(10).unwrap();

        assert!((model.mean - 0.5).abs() < 0.05);
        assert!(forecast.mean[9] > forecast.mean[0]);
    }

    #[test]
    fn test_short_series_rejected() {
        let err = ArimaModel::fit(&[1.0, 2.0, 3.0], spec(1, 1, 1, false)).unwrap_err();
        assert!(matches!(err, ModelFitError::SeriesTooShort { .. }));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut data = shocks(50, 1);
        data[10] = f64::NAN;
        assert_eq!(
            ArimaModel::fit(&data, spec(0, 0, 0, true)).unwrap_err(),
            ModelFitError::NonFiniteValues
        );
    }
}
