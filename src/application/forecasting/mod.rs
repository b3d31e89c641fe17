pub mod arima;
pub mod auto_arima;
pub mod forecaster;
pub mod stationarity;

pub use arima::{ArimaModel, ArimaSpec, Forecast};
pub use auto_arima::AutoArima;
pub use forecaster::{ClusterForecaster, ForecastOutcome};
