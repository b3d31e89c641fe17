use coinclust::application::scoring::{ClusterPerformanceScorer, ntile, recommend};
use coinclust::config::ScoringConfig;
use coinclust::domain::types::{ClusterPerformance, RecommendationLabel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_performances(rng: &mut StdRng, k: usize) -> Vec<ClusterPerformance> {
    (1..=k)
        .map(|cluster_id| ClusterPerformance {
            cluster_id,
            cumulative_return: rng.random_range(-0.5..0.5),
            volatility: rng.random_range(0.1..10.0),
            momentum: rng.random_range(-2.0..2.0),
            observations: 30,
        })
        .collect()
}

#[test]
fn test_scores_stay_within_three_and_nine() {
    let mut rng = StdRng::seed_from_u64(11);
    for k in 3..=6 {
        for _ in 0..50 {
            let performances = random_performances(&mut rng, k);
            let scores = ClusterPerformanceScorer::scores(&performances);
            assert_eq!(scores.len(), k);
            for score in &scores {
                assert!((3..=9).contains(&score.overall_score));
                assert_eq!(
                    score.overall_score,
                    score.return_score + score.volatility_score + score.momentum_score
                );
            }
        }
    }
}

#[test]
fn test_every_tier_is_used_when_there_are_at_least_three_clusters() {
    let mut rng = StdRng::seed_from_u64(12);
    for k in 3..=6 {
        let performances = random_performances(&mut rng, k);
        for tiers in [
            ClusterPerformanceScorer::scores(&performances)
                .iter()
                .map(|s| s.return_score)
                .collect::<Vec<_>>(),
            ClusterPerformanceScorer::scores(&performances)
                .iter()
                .map(|s| s.volatility_score)
                .collect(),
        ] {
            for tier in 1..=3u8 {
                assert!(tiers.contains(&tier), "k={} missing tier {}", k, tier);
            }
        }
    }
}

#[test]
fn test_higher_volatility_never_scores_higher() {
    let mut rng = StdRng::seed_from_u64(13);
    let performances = random_performances(&mut rng, 6);
    let scores = ClusterPerformanceScorer::scores(&performances);

    for (a, sa) in performances.iter().zip(&scores) {
        for (b, sb) in performances.iter().zip(&scores) {
            if a.volatility > b.volatility {
                assert!(sa.volatility_score <= sb.volatility_score);
            }
            if a.cumulative_return > b.cumulative_return {
                assert!(sa.return_score >= sb.return_score);
            }
        }
    }
}

#[test]
fn test_label_follows_thresholds() {
    let config = ScoringConfig::default();
    for score in 3..=9u8 {
        let expected = if score >= config.buy_threshold {
            RecommendationLabel::Buy
        } else if score <= config.sell_threshold {
            RecommendationLabel::Sell
        } else {
            RecommendationLabel::Hold
        };
        assert_eq!(recommend(score, &config), expected);
    }
    assert_eq!(recommend(7, &config), RecommendationLabel::Buy);
    assert_eq!(recommend(6, &config), RecommendationLabel::Hold);
    assert_eq!(recommend(5, &config), RecommendationLabel::Sell);
}

#[test]
fn test_ntile_bucket_sizes_are_balanced() {
    for len in 1..=12 {
        let values: Vec<f64> = (0..len).map(|i| i as f64).collect();
        let tiers = ntile(&values, false);
        let counts: Vec<usize> = (1..=3u8)
            .map(|t| tiers.iter().filter(|&&x| x == t).count())
            .collect();
        let max = *counts.iter().max().unwrap();
        let min = *counts.iter().min().unwrap();
        assert!(max - min <= 1, "len {}: {:?}", len, counts);
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }
}
