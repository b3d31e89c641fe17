use super::arima::{ArimaModel, ArimaSpec};
use super::stationarity::{ndiffs, nsdiffs};
use crate::config::ForecastConfig;
use crate::domain::errors::ModelFitError;
use std::collections::BTreeSet;
use tracing::debug;

/// Shortest series a model search is attempted on.
pub const MIN_OBSERVATIONS: usize = 20;

/// Upper bound on candidates evaluated by the stepwise search.
const MAX_STEPWISE_MODELS: usize = 94;

/// Upper bound on p + q in the full grid search.
const MAX_GRID_ORDER: usize = 5;

/// Automatic ARIMA order selection by AICc.
///
/// Integration orders are fixed first (seasonal strength for D, repeated KPSS
/// tests for d). The (p, q, constant) search then runs either stepwise from a
/// handful of starting models or over the full bounded grid. Seasonal AR and
/// MA terms are never searched; only seasonal differencing is applied.
#[derive(Debug, Clone)]
pub struct AutoArima {
    pub max_p: usize,
    pub max_q: usize,
    pub max_d: usize,
    pub seasonal_period: usize,
    pub stepwise: bool,
}

impl AutoArima {
    pub fn from_config(config: &ForecastConfig) -> Self {
        Self {
            max_p: config.max_p,
            max_q: config.max_q,
            max_d: config.max_d,
            seasonal_period: config.seasonal_period,
            stepwise: config.stepwise,
        }
    }

    pub fn fit(&self, series: &[f64]) -> Result<ArimaModel, ModelFitError> {
        if series.iter().any(|v| !v.is_finite()) {
            return Err(ModelFitError::NonFiniteValues);
        }
        if series.len() < MIN_OBSERVATIONS {
            return Err(ModelFitError::SeriesTooShort {
                len: series.len(),
                required: MIN_OBSERVATIONS,
            });
        }
        if is_constant(series) {
            return Err(ModelFitError::ConstantSeries);
        }

        let seasonal_d = if self.seasonal_period > 1 {
            nsdiffs(series, self.seasonal_period)
        } else {
            0
        };
        let base = ArimaSpec {
            p: 0,
            d: 0,
            q: 0,
            seasonal_d,
            period: self.seasonal_period,
            include_constant: false,
        };
        let d = ndiffs(&base.difference(series), self.max_d);
        let allow_constant = d + seasonal_d <= 1;
        debug!(
            "Integration orders d={} D={} (constant allowed: {})",
            d, seasonal_d, allow_constant
        );

        let template = ArimaSpec { d, ..base };
        let mut search = Search::new(series);
        if self.stepwise {
            self.stepwise_search(template, allow_constant, &mut search);
        } else {
            self.grid_search(template, allow_constant, &mut search);
        }

        let tried = search.visited.len();
        search
            .best
            .ok_or(ModelFitError::NoAdmissibleModel { candidates: tried })
    }

    fn stepwise_search(&self, template: ArimaSpec, allow_constant: bool, search: &mut Search<'_>) {
        let with = |p: usize, q: usize, include_constant: bool| ArimaSpec {
            p,
            q,
            include_constant,
            ..template
        };

        let mut starts = vec![
            with(2, 2, allow_constant),
            with(0, 0, allow_constant),
            with(1, 0, allow_constant),
            with(0, 1, allow_constant),
        ];
        // The constant-free null model is only a distinct start when a constant is allowed.
        if allow_constant {
            starts.push(with(0, 0, false));
        }
        for spec in starts {
            if spec.p <= self.max_p && spec.q <= self.max_q {
                search.consider(spec);
            }
        }

        while search.visited.len() < MAX_STEPWISE_MODELS {
            let Some(current) = search.best.as_ref().map(|m| m.spec) else {
                return;
            };
            let (p, q, c) = (current.p as i64, current.q as i64, current.include_constant);
            let mut neighbours = vec![
                (p - 1, q, c),
                (p + 1, q, c),
                (p, q - 1, c),
                (p, q + 1, c),
                (p - 1, q - 1, c),
                (p + 1, q + 1, c),
            ];
            if allow_constant {
                neighbours.push((p, q, !c));
            }

            let mut improved = false;
            for (np, nq, nc) in neighbours {
                if np < 0 || nq < 0 || np as usize > self.max_p || nq as usize > self.max_q {
                    continue;
                }
                let spec = with(np as usize, nq as usize, nc);
                if search.visited.contains(&spec) {
                    continue;
                }
                if search.consider(spec) {
                    improved = true;
                    break;
                }
            }
            if !improved {
                return;
            }
        }
    }

    fn grid_search(&self, template: ArimaSpec, allow_constant: bool, search: &mut Search<'_>) {
        let constants: &[bool] = if allow_constant { &[true, false] } else { &[false] };
        for p in 0..=self.max_p {
            for q in 0..=self.max_q {
                if p + q > MAX_GRID_ORDER {
                    continue;
                }
                for &include_constant in constants {
                    search.consider(ArimaSpec {
                        p,
                        q,
                        include_constant,
                        ..template
                    });
                }
            }
        }
    }
}

/// Candidate bookkeeping for one search.
struct Search<'a> {
    series: &'a [f64],
    visited: BTreeSet<ArimaSpec>,
    best: Option<ArimaModel>,
}

impl<'a> Search<'a> {
    fn new(series: &'a [f64]) -> Self {
        Self {
            series,
            visited: BTreeSet::new(),
            best: None,
        }
    }

    /// Fits one candidate. Returns true when it strictly improves on the best.
    fn consider(&mut self, spec: ArimaSpec) -> bool {
        if !self.visited.insert(spec) {
            return false;
        }
        match ArimaModel::fit(self.series, spec) {
            Ok(model) => {
                debug!(
                    "Candidate ARIMA({},{},{}) constant={} AICc={:.3}",
                    spec.p, spec.d, spec.q, spec.include_constant, model.aicc
                );
                let better = self.best.as_ref().is_none_or(|b| model.aicc < b.aicc);
                if better {
                    self.best = Some(model);
                }
                better
            }
            Err(e) => {
                debug!("Candidate rejected: {}", e);
                false
            }
        }
    }
}

fn is_constant(series: &[f64]) -> bool {
    let (min, max) = series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let scale = min.abs().max(max.abs()).max(1.0);
    max - min <= 1e-10 * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(i: usize) -> f64 {
        ((i * 7919) % 1000) as f64 / 1000.0 - 0.5
    }

    fn searcher(stepwise: bool) -> AutoArima {
        AutoArima {
            max_p: 3,
            max_q: 3,
            max_d: 2,
            seasonal_period: 365,
            stepwise,
        }
    }

    #[test]
    fn test_stationary_series_not_differenced() {
        let series: Vec<f64> = (0..300).map(|i| 50.0 + noise(i)).collect();
        let model = searcher(true).fit(&series).unwrap();
        assert_eq!(model.spec.d, 0);
        assert_eq!(model.spec.seasonal_d, 0);
    }

    #[test]
    fn test_trending_series_differenced_once() {
        let mut level = 100.0;
        let series: Vec<f64> = (0..300)
            .map(|i| {
                level += 0.3 + noise(i);
                level
            })
            .collect();

        let model = searcher(true).fit(&series).unwrap();
        assert_eq!(model.spec.d, 1);
        assert!(model.aicc.is_finite());
    }

    #[test]
    fn test_grid_never_worse_than_stepwise() {
        // With p, q <= 2 the grid covers every model the stepwise search can reach.
        let bounded = |stepwise| AutoArima {
            max_p: 2,
            max_q: 2,
            ..searcher(stepwise)
        };
        let series: Vec<f64> = (0..200).map(|i| 10.0 + noise(i) + 0.5 * noise(i / 3)).collect();
        let grid = bounded(false).fit(&series).unwrap();
        let stepwise = bounded(true).fit(&series).unwrap();
        assert!(grid.aicc <= stepwise.aicc + 1e-9);
    }

    #[test]
    fn test_search_is_deterministic() {
        let series: Vec<f64> = (0..250).map(|i| (i as f64 * 0.1).sin() + noise(i)).collect();
        let a = searcher(true).fit(&series).unwrap();
        let b = searcher(true).fit(&series).unwrap();
        assert_eq!(a.summary(), b.summary());
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(
            searcher(true).fit(&[7.0; 100]).unwrap_err(),
            ModelFitError::ConstantSeries
        );
        assert!(matches!(
            searcher(true).fit(&[1.0, 2.0, 3.0]).unwrap_err(),
            ModelFitError::SeriesTooShort { .. }
        ));
    }
}
