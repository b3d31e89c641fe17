pub mod performance_scorer;

pub use performance_scorer::{
    ClusterPerformanceScorer, ClusterScore, ScoringOutcome, ntile, recommend,
};
