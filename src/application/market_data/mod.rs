// Market data processing modules
pub mod cluster_series;
pub mod feature_engineering;

pub use cluster_series::aggregate_cluster_series;
pub use feature_engineering::FeatureEngineeringService;
