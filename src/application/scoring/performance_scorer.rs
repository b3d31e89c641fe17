use crate::config::ScoringConfig;
use crate::domain::performance::Stats;
use crate::domain::types::{
    ClusterAssignment, ClusterId, ClusterPerformance, FeatureRow, Recommendation,
    RecommendationLabel,
};
use chrono::Days;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Number of tiers each metric is ranked into.
pub const TIERS: usize = 3;

/// Per-metric tier scores of one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterScore {
    pub cluster_id: ClusterId,
    pub return_score: u8,
    pub volatility_score: u8,
    pub momentum_score: u8,
    pub overall_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringOutcome {
    pub performances: Vec<ClusterPerformance>,
    pub scores: Vec<ClusterScore>,
    pub recommendations: Vec<Recommendation>,
    /// Clusters without a single row in the trailing window.
    pub empty_clusters: Vec<ClusterId>,
    /// Window rows dropped because their symbol has no cluster.
    pub excluded_unassigned_rows: usize,
}

/// Splits `values` into `TIERS` near-equal buckets by rank, lowest values in
/// tier 1. Ties keep input order. Larger buckets come first when the count
/// is not a multiple of the tier count.
pub fn ntile(values: &[f64], descending: bool) -> Vec<u8> {
    let len = values.len();
    if len == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..len).collect();
    order.sort_by(|&a, &b| {
        let ord = values[a].total_cmp(&values[b]);
        if descending { ord.reverse() } else { ord }
    });

    let n_larger = len % TIERS;
    let smaller_size = len / TIERS;
    let larger_size = smaller_size + usize::from(n_larger > 0);
    let larger_threshold = larger_size * n_larger;

    let mut tiers = vec![0u8; len];
    for (position, &index) in order.iter().enumerate() {
        let rank = position + 1;
        let tier = if rank <= larger_threshold {
            (rank - 1) / larger_size + 1
        } else {
            (rank - larger_threshold - 1) / smaller_size + n_larger + 1
        };
        tiers[index] = tier as u8;
    }
    tiers
}

/// Maps an overall score to a label. Scores between the two thresholds hold.
pub fn recommend(overall_score: u8, config: &ScoringConfig) -> RecommendationLabel {
    if overall_score >= config.buy_threshold {
        RecommendationLabel::Buy
    } else if overall_score <= config.sell_threshold {
        RecommendationLabel::Sell
    } else {
        RecommendationLabel::Hold
    }
}

/// Scores clusters on the pooled daily returns of their members over a
/// trailing calendar window ending at the latest date in the data.
pub struct ClusterPerformanceScorer {
    config: ScoringConfig,
}

impl ClusterPerformanceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Pooled window statistics per cluster. Clusters without rows are absent.
    pub fn performances(
        &self,
        rows: &[FeatureRow],
        assignment: &ClusterAssignment,
    ) -> (Vec<ClusterPerformance>, usize) {
        let Some(max_date) = rows.iter().map(|r| r.date).max() else {
            return (Vec::new(), 0);
        };
        let window_start = max_date
            .checked_sub_days(Days::new(u64::from(self.config.performance_window_days)))
            .unwrap_or(chrono::NaiveDate::MIN);

        let mut window: Vec<&FeatureRow> = rows.iter().filter(|r| r.date > window_start).collect();
        window.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));

        let mut pooled: BTreeMap<ClusterId, Vec<f64>> = BTreeMap::new();
        let mut unassigned = 0;
        for row in window {
            match assignment.cluster_of(&row.symbol) {
                Some(cluster_id) => pooled.entry(cluster_id).or_default().push(row.daily_return),
                None => unassigned += 1,
            }
        }
        if unassigned > 0 {
            warn!(
                "{} rows in the performance window belong to unassigned symbols and were excluded",
                unassigned
            );
        }

        let performances = pooled
            .into_iter()
            .map(|(cluster_id, returns)| ClusterPerformance {
                cluster_id,
                cumulative_return: Stats::compounded_return(&returns),
                volatility: Stats::sample_std_dev(&returns),
                momentum: Stats::mean(&returns).unwrap_or(0.0),
                observations: returns.len(),
            })
            .collect();
        (performances, unassigned)
    }

    /// Tier scores over the given clusters, in the same order.
    pub fn scores(performances: &[ClusterPerformance]) -> Vec<ClusterScore> {
        let returns: Vec<f64> = performances.iter().map(|p| p.cumulative_return).collect();
        let volatilities: Vec<f64> = performances.iter().map(|p| p.volatility).collect();
        let momenta: Vec<f64> = performances.iter().map(|p| p.momentum).collect();

        let return_tiers = ntile(&returns, false);
        let volatility_tiers = ntile(&volatilities, true);
        let momentum_tiers = ntile(&momenta, false);

        performances
            .iter()
            .enumerate()
            .map(|(i, p)| ClusterScore {
                cluster_id: p.cluster_id,
                return_score: return_tiers[i],
                volatility_score: volatility_tiers[i],
                momentum_score: momentum_tiers[i],
                overall_score: return_tiers[i] + volatility_tiers[i] + momentum_tiers[i],
            })
            .collect()
    }

    pub fn score(&self, rows: &[FeatureRow], assignment: &ClusterAssignment) -> ScoringOutcome {
        let (performances, excluded_unassigned_rows) = self.performances(rows, assignment);

        let empty_clusters: Vec<ClusterId> = assignment
            .cluster_ids()
            .into_iter()
            .filter(|c| !performances.iter().any(|p| p.cluster_id == *c))
            .collect();
        for cluster_id in &empty_clusters {
            warn!(
                "Cluster {} has no rows in the {}-day performance window",
                cluster_id, self.config.performance_window_days
            );
        }

        let scores = Self::scores(&performances);
        let recommendations: Vec<Recommendation> = scores
            .iter()
            .map(|s| Recommendation {
                cluster_id: s.cluster_id,
                label: recommend(s.overall_score, &self.config),
                overall_score: s.overall_score,
            })
            .collect();

        for r in &recommendations {
            info!(
                "Cluster {}: score {} -> {}",
                r.cluster_id, r.overall_score, r.label
            );
        }

        ScoringOutcome {
            performances,
            scores,
            recommendations,
            empty_clusters,
            excluded_unassigned_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(symbol: &str, date: NaiveDate, daily_return: f64) -> FeatureRow {
        FeatureRow {
            symbol: symbol.to_string(),
            date,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
            daily_return,
            volatility: 0.0,
            ma_short: 1.0,
            ma_long: 1.0,
            high_low_range: 0.0,
            normalized_volume: 0.0,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn assignment(pairs: &[(&str, ClusterId)], k: usize) -> ClusterAssignment {
        ClusterAssignment::new(
            k,
            pairs.iter().map(|(s, c)| (s.to_string(), *c)).collect(),
        )
    }

    #[test]
    fn test_ntile_three_values() {
        assert_eq!(ntile(&[0.5, -1.0, 2.0], false), vec![2, 1, 3]);
        assert_eq!(ntile(&[0.5, -1.0, 2.0], true), vec![2, 3, 1]);
    }

    #[test]
    fn test_ntile_ties_are_stable() {
        assert_eq!(ntile(&[1.0, 1.0, 1.0], false), vec![1, 2, 3]);
        assert_eq!(ntile(&[1.0, 1.0, 1.0], true), vec![1, 2, 3]);
    }

    #[test]
    fn test_ntile_uneven_sizes() {
        assert_eq!(ntile(&[1.0, 2.0], false), vec![1, 2]);
        assert_eq!(ntile(&[4.0, 3.0, 2.0, 1.0], false), vec![3, 2, 1, 1]);
        assert_eq!(ntile(&[1.0, 2.0, 3.0, 4.0, 5.0], false), vec![1, 1, 2, 2, 3]);
    }

    #[test]
    fn test_recommendation_boundaries() {
        let config = ScoringConfig::default();
        assert_eq!(recommend(9, &config), RecommendationLabel::Buy);
        assert_eq!(recommend(7, &config), RecommendationLabel::Buy);
        assert_eq!(recommend(6, &config), RecommendationLabel::Hold);
        assert_eq!(recommend(5, &config), RecommendationLabel::Sell);
        assert_eq!(recommend(3, &config), RecommendationLabel::Sell);
    }

    #[test]
    fn test_pooled_statistics() {
        let rows = vec![
            row("BTC", day(10), 10.0),
            row("ETH", day(10), -10.0),
            row("BTC", day(11), 5.0),
        ];
        let scorer = ClusterPerformanceScorer::new(ScoringConfig::default());
        let (performances, unassigned) =
            scorer.performances(&rows, &assignment(&[("BTC", 1), ("ETH", 1)], 1));

        assert_eq!(unassigned, 0);
        let p = &performances[0];
        assert_eq!(p.observations, 3);
        // 1.10 * 0.90 * 1.05 - 1
        assert!((p.cumulative_return - (1.1 * 0.9 * 1.05 - 1.0)).abs() < 1e-12);
        assert!((p.momentum - 5.0 / 3.0).abs() < 1e-12);
        assert!((p.volatility - Stats::sample_std_dev(&[10.0, -10.0, 5.0])).abs() < 1e-12);
    }

    #[test]
    fn test_window_is_relative_to_latest_date() {
        let scorer = ClusterPerformanceScorer::new(ScoringConfig {
            performance_window_days: 2,
            ..ScoringConfig::default()
        });
        let rows = vec![
            row("BTC", day(1), 50.0),
            row("BTC", day(9), 1.0),
            row("BTC", day(10), 2.0),
        ];
        let (performances, _) = scorer.performances(&rows, &assignment(&[("BTC", 1)], 1));
        assert_eq!(performances[0].observations, 2);
    }

    #[test]
    fn test_score_three_clusters() {
        let rows = vec![
            row("UP", day(5), 3.0),
            row("UP", day(6), 2.0),
            row("FLAT", day(5), 0.1),
            row("FLAT", day(6), -0.1),
            row("DOWN", day(5), -4.0),
            row("DOWN", day(6), 3.5),
            row("DOGE", day(6), 100.0),
        ];
        let scorer = ClusterPerformanceScorer::new(ScoringConfig::default());
        let outcome = scorer.score(
            &rows,
            &assignment(&[("UP", 1), ("FLAT", 2), ("DOWN", 3)], 3),
        );

        assert_eq!(outcome.excluded_unassigned_rows, 1);
        assert!(outcome.empty_clusters.is_empty());

        for s in &outcome.scores {
            assert!((3..=9).contains(&s.overall_score));
        }
        // UP: best return, best momentum, middle volatility.
        assert_eq!(outcome.scores[0].overall_score, 8);
        assert_eq!(outcome.recommendations[0].label, RecommendationLabel::Buy);
        // DOWN: worst return, most volatile, weakest momentum.
        assert_eq!(outcome.scores[2].overall_score, 3);
        assert_eq!(outcome.recommendations[2].label, RecommendationLabel::Sell);
    }

    #[test]
    fn test_empty_cluster_reported() {
        let rows = vec![row("BTC", day(5), 1.0), row("ETH", day(5), 2.0)];
        let scorer = ClusterPerformanceScorer::new(ScoringConfig::default());
        let outcome = scorer.score(&rows, &assignment(&[("BTC", 1), ("ETH", 3)], 3));

        assert_eq!(outcome.empty_clusters, vec![2]);
        assert_eq!(outcome.recommendations.len(), 2);
    }
}
