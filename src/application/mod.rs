// Per-symbol feature engineering and cluster series aggregation
pub mod market_data;

// Dimensionality reduction
pub mod ml;

// Shape-based clustering of asset trajectories
pub mod clustering;

// Recent-performance scoring and recommendations
pub mod scoring;

// Automatic ARIMA forecasting per cluster
pub mod forecasting;

// Run orchestration and output
pub mod pipeline;
pub mod reporting;
