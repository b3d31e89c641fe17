use super::dtw::distance_matrix;
use crate::config::ClusteringConfig;
use crate::domain::errors::{ConfigurationError, ConsistencyError};
use crate::domain::types::{AssetSeries, ClusterAssignment, ClusterId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Minimum cost reduction for a medoid swap to count as an improvement.
const SWAP_TOLERANCE: f64 = 1e-12;

/// Result of one clustering run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringOutcome {
    pub assignment: ClusterAssignment,
    /// Symbol of the medoid series of each cluster.
    pub medoids: BTreeMap<ClusterId, String>,
    pub iterations: usize,
    pub converged: bool,
    /// Sum of each series' DTW distance to its cluster medoid.
    pub total_cost: f64,
}

/// Partitions asset trajectories into k clusters around medoid series, using
/// DTW as the dissimilarity.
pub struct TimeSeriesClusterer {
    config: ClusteringConfig,
}

impl TimeSeriesClusterer {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn cluster(&self, series: &[AssetSeries]) -> Result<ClusteringOutcome, ConfigurationError> {
        let k = self.config.k;
        if k == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "k",
                reason: "must be at least 1".to_string(),
            });
        }
        if series.len() < k {
            return Err(ConfigurationError::TooFewSeries {
                k,
                series: series.len(),
            });
        }

        let mut ordered: Vec<&AssetSeries> = series.iter().collect();
        ordered.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        let trajectories: Vec<Vec<[f64; 2]>> = ordered.iter().map(|s| s.coordinates()).collect();

        info!(
            "Clustering {} series into k={} (seed {}), computing {} pairwise DTW distances",
            ordered.len(),
            k,
            self.config.seed,
            ordered.len() * (ordered.len() - 1) / 2
        );
        let distances = distance_matrix(&trajectories);

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut medoids = sample(&mut rng, ordered.len(), k).into_vec();
        let mut labels = assign(&distances, &medoids);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            iterations += 1;
            medoids = update_medoids(&distances, &labels, &medoids);
            let next = assign(&distances, &medoids);
            let changed = next.iter().zip(&labels).filter(|(a, b)| a != b).count();
            debug!("PAM iteration {}: {} reassignments", iterations, changed);
            labels = next;
            if changed == 0 {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                "Clustering stopped after {} iterations without stabilizing",
                iterations
            );
        }

        let swaps = swap_medoids(&distances, &mut medoids);
        if swaps > 0 {
            debug!("PAM swap phase: {} medoid swaps", swaps);
            labels = assign(&distances, &medoids);
        }
        let total_cost = assignment_cost(&distances, &medoids, &labels);

        let clusters: BTreeMap<String, ClusterId> = ordered
            .iter()
            .zip(&labels)
            .map(|(s, &c)| (s.symbol.clone(), c + 1))
            .collect();
        let medoid_symbols: BTreeMap<ClusterId, String> = medoids
            .iter()
            .enumerate()
            .map(|(c, &m)| (c + 1, ordered[m].symbol.clone()))
            .collect();

        let assignment = ClusterAssignment::new(k, clusters);
        info!(
            "Clustering finished after {} iterations (converged: {}), sizes {:?}, cost {:.4}",
            iterations,
            converged,
            assignment.cluster_sizes(),
            total_cost
        );

        Ok(ClusteringOutcome {
            assignment,
            medoids: medoid_symbols,
            iterations,
            converged,
            total_cost,
        })
    }
}

/// Nearest-medoid assignment (0-based cluster indices). Ties go to the lowest
/// cluster index; each medoid always stays in its own cluster.
fn assign(distances: &[Vec<f64>], medoids: &[usize]) -> Vec<usize> {
    let mut labels: Vec<usize> = (0..distances.len())
        .into_par_iter()
        .map(|i| {
            let mut best = 0;
            for c in 1..medoids.len() {
                if distances[i][medoids[c]] < distances[i][medoids[best]] {
                    best = c;
                }
            }
            best
        })
        .collect();

    for (c, &m) in medoids.iter().enumerate() {
        labels[m] = c;
    }
    labels
}

/// For each cluster, the member minimizing the summed distance to all other
/// members. Ties go to the earlier series.
fn update_medoids(distances: &[Vec<f64>], labels: &[usize], medoids: &[usize]) -> Vec<usize> {
    (0..medoids.len())
        .map(|c| {
            let members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == c).collect();
            let mut best = medoids[c];
            let mut best_cost = f64::INFINITY;
            for &candidate in &members {
                let cost: f64 = members.iter().map(|&o| distances[candidate][o]).sum();
                if cost < best_cost {
                    best = candidate;
                    best_cost = cost;
                }
            }
            best
        })
        .collect()
}

fn assignment_cost(distances: &[Vec<f64>], medoids: &[usize], labels: &[usize]) -> f64 {
    labels
        .iter()
        .enumerate()
        .map(|(i, &c)| distances[i][medoids[c]])
        .sum()
}

/// PAM swap phase. Repeatedly applies the medoid/non-medoid exchange that
/// lowers the total cost the most, until none does. Candidates are scanned by
/// cluster index then series index, and ties keep the first one found.
/// Returns the number of swaps applied.
fn swap_medoids(distances: &[Vec<f64>], medoids: &mut [usize]) -> usize {
    let mut current = assignment_cost(distances, medoids, &assign(distances, medoids));
    let mut swaps = 0;

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for c in 0..medoids.len() {
            for candidate in 0..distances.len() {
                if medoids.contains(&candidate) {
                    continue;
                }
                let mut trial = medoids.to_vec();
                trial[c] = candidate;
                let cost = assignment_cost(distances, &trial, &assign(distances, &trial));
                let threshold = best.map_or(current, |(_, _, b)| b);
                if cost < threshold - SWAP_TOLERANCE {
                    best = Some((c, candidate, cost));
                }
            }
        }

        let Some((c, candidate, cost)) = best else {
            return swaps;
        };
        medoids[c] = candidate;
        current = cost;
        swaps += 1;
    }
}

/// Checks that `assignment` maps exactly the given symbols, each to a valid cluster.
pub fn verify_assignment(
    symbols: &[&str],
    assignment: &ClusterAssignment,
) -> Result<(), ConsistencyError> {
    for symbol in symbols {
        if assignment.cluster_of(symbol).is_none() {
            return Err(ConsistencyError::UnassignedSymbol {
                symbol: symbol.to_string(),
            });
        }
    }
    for (symbol, cluster_id) in assignment.iter() {
        if !symbols.contains(&symbol) {
            return Err(ConsistencyError::UnknownSymbol {
                symbol: symbol.to_string(),
            });
        }
        if cluster_id < 1 || cluster_id > assignment.k() {
            return Err(ConsistencyError::ClusterOutOfRange {
                cluster_id,
                k: assignment.k(),
            });
        }
    }
    if assignment.len() != symbols.len() {
        return Err(ConsistencyError::CardinalityMismatch {
            expected: symbols.len(),
            actual: assignment.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ReducedPoint;
    use chrono::{Days, NaiveDate};

    fn asset(symbol: &str, values: &[(f64, f64)]) -> AssetSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        AssetSeries {
            symbol: symbol.to_string(),
            points: values
                .iter()
                .enumerate()
                .map(|(i, &(a, b))| ReducedPoint {
                    symbol: symbol.to_string(),
                    date: start + Days::new(i as u64),
                    component_1: a,
                    component_2: b,
                })
                .collect(),
        }
    }

    fn three_groups() -> Vec<AssetSeries> {
        vec![
            asset("A1", &[(0.0, 0.0), (0.1, 0.0), (0.0, 0.1)]),
            asset("A2", &[(0.0, 0.1), (0.1, 0.1)]),
            asset("B1", &[(5.0, 5.0), (5.1, 5.0), (5.0, 5.2), (5.0, 5.0)]),
            asset("B2", &[(5.1, 5.1), (5.0, 5.0)]),
            asset("C1", &[(-5.0, 5.0), (-5.0, 5.1)]),
            asset("C2", &[(-5.1, 5.0), (-5.0, 5.0), (-5.2, 5.1)]),
        ]
    }

    fn config(k: usize, seed: u64) -> ClusteringConfig {
        ClusteringConfig {
            k,
            seed,
            max_iterations: 50,
        }
    }

    #[test]
    fn test_every_symbol_in_exactly_one_cluster() {
        let series = three_groups();
        let outcome = TimeSeriesClusterer::new(config(3, 2024))
            .cluster(&series)
            .unwrap();

        let symbols: Vec<&str> = series.iter().map(|s| s.symbol.as_str()).collect();
        assert!(verify_assignment(&symbols, &outcome.assignment).is_ok());
        assert!(outcome.assignment.cluster_sizes().values().all(|&n| n > 0));
    }

    #[test]
    fn test_separated_groups_recovered() {
        for seed in [1, 7, 2024, 99] {
            let outcome = TimeSeriesClusterer::new(config(3, seed))
                .cluster(&three_groups())
                .unwrap();
            let a = &outcome.assignment;

            assert!(outcome.converged);
            assert_eq!(a.cluster_of("A1"), a.cluster_of("A2"));
            assert_eq!(a.cluster_of("B1"), a.cluster_of("B2"));
            assert_eq!(a.cluster_of("C1"), a.cluster_of("C2"));
            assert_ne!(a.cluster_of("A1"), a.cluster_of("B1"));
            assert_ne!(a.cluster_of("B1"), a.cluster_of("C1"));
        }
    }

    #[test]
    fn test_swap_escapes_two_medoids_in_one_group() {
        let outcome = TimeSeriesClusterer::new(config(3, 1))
            .cluster(&three_groups())
            .unwrap();
        let a = &outcome.assignment;

        assert!(outcome.total_cost < 1.0, "cost {}", outcome.total_cost);
        let medoid_groups: Vec<char> = outcome
            .medoids
            .values()
            .filter_map(|s| s.chars().next())
            .collect();
        assert!(medoid_groups.contains(&'A'));
        assert!(medoid_groups.contains(&'B'));
        assert!(medoid_groups.contains(&'C'));
        assert_eq!(a.cluster_sizes().values().copied().collect::<Vec<_>>(), vec![2, 2, 2]);
    }

    #[test]
    fn test_swap_phase_never_raises_cost() {
        let series = three_groups();
        let trajectories: Vec<Vec<[f64; 2]>> = series.iter().map(|s| s.coordinates()).collect();
        let distances = distance_matrix(&trajectories);

        for start in [[2, 3, 4], [0, 1, 2], [4, 5, 0], [3, 2, 1]] {
            let mut medoids = start.to_vec();
            let before = assignment_cost(&distances, &medoids, &assign(&distances, &medoids));
            swap_medoids(&distances, &mut medoids);
            let after = assignment_cost(&distances, &medoids, &assign(&distances, &medoids));
            assert!(after <= before);
            assert!(after < 1.0, "start {:?} ended at {}", start, after);
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let clusterer = TimeSeriesClusterer::new(config(2, 42));
        let first = clusterer.cluster(&three_groups()).unwrap();
        let second = clusterer.cluster(&three_groups()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_too_few_series_is_configuration_error() {
        let series = three_groups();
        let err = TimeSeriesClusterer::new(config(7, 1))
            .cluster(&series)
            .unwrap_err();
        assert_eq!(err, ConfigurationError::TooFewSeries { k: 7, series: 6 });
    }

    #[test]
    fn test_identical_series_do_not_empty_a_cluster() {
        let series = vec![
            asset("X", &[(1.0, 1.0)]),
            asset("Y", &[(1.0, 1.0)]),
            asset("Z", &[(1.0, 1.0)]),
        ];
        let outcome = TimeSeriesClusterer::new(config(3, 5))
            .cluster(&series)
            .unwrap();
        assert!(outcome.assignment.cluster_sizes().values().all(|&n| n == 1));
    }

    #[test]
    fn test_verify_assignment_detects_missing_symbol() {
        let mut map = BTreeMap::new();
        map.insert("BTC".to_string(), 1);
        let assignment = ClusterAssignment::new(1, map);

        let err = verify_assignment(&["BTC", "ETH"], &assignment).unwrap_err();
        assert_eq!(
            err,
            ConsistencyError::UnassignedSymbol {
                symbol: "ETH".to_string()
            }
        );
    }
}
