// Dimensionality reduction of the feature space
pub mod pca_reducer;

pub use pca_reducer::{DimensionalityReducer, Reduction, ReductionSummary};
