// Return and dispersion statistics
pub mod stats;

pub use stats::Stats;
