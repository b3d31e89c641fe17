pub mod dtw;
pub mod medoids;

pub use dtw::{distance_matrix, dtw_distance};
pub use medoids::{ClusteringOutcome, TimeSeriesClusterer, verify_assignment};
