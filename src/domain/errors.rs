use serde::Serialize;
use thiserror::Error;

/// Kinds of data-quality problems, used as counting keys in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DataQualityKind {
    MissingField,
    NonPositivePrice,
    InvertedRange,
    NegativeVolume,
    DuplicateObservation,
    InsufficientHistory,
}

/// Non-fatal input problems. The offending row or symbol is excluded and counted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataQualityIssue {
    #[error("Missing field '{field}' for {symbol} on {date}")]
    MissingField {
        symbol: String,
        date: String,
        field: &'static str,
    },

    #[error("Non-positive price component for {symbol} on {date}")]
    NonPositivePrice { symbol: String, date: String },

    #[error("Inverted range for {symbol} on {date}: low {low} > high {high}")]
    InvertedRange {
        symbol: String,
        date: String,
        low: f64,
        high: f64,
    },

    #[error("Negative volume for {symbol} on {date}: {volume}")]
    NegativeVolume {
        symbol: String,
        date: String,
        volume: f64,
    },

    #[error("Duplicate observation for {symbol} on {date}")]
    DuplicateObservation { symbol: String, date: String },

    #[error("Insufficient history for {symbol}: {observations} observations < {required} required")]
    InsufficientHistory {
        symbol: String,
        observations: usize,
        required: usize,
    },
}

impl DataQualityIssue {
    pub fn kind(&self) -> DataQualityKind {
        match self {
            DataQualityIssue::MissingField { .. } => DataQualityKind::MissingField,
            DataQualityIssue::NonPositivePrice { .. } => DataQualityKind::NonPositivePrice,
            DataQualityIssue::InvertedRange { .. } => DataQualityKind::InvertedRange,
            DataQualityIssue::NegativeVolume { .. } => DataQualityKind::NegativeVolume,
            DataQualityIssue::DuplicateObservation { .. } => DataQualityKind::DuplicateObservation,
            DataQualityIssue::InsufficientHistory { .. } => DataQualityKind::InsufficientHistory,
        }
    }
}

/// Fatal configuration problems. The run aborts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Cluster count k={k} exceeds the {series} symbols with valid series")]
    TooFewSeries { k: usize, series: usize },

    #[error("Rolling window needs {required} observations but the longest series has {longest}")]
    WindowExceedsHistory { required: usize, longest: usize },

    #[error("No valid feature rows remain after data-quality filtering")]
    NoValidRows,
}

/// Fatal symbol/cluster cardinality problems detected after clustering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("Symbol {symbol} has no cluster assignment")]
    UnassignedSymbol { symbol: String },

    #[error("Cluster assignment contains unknown symbol {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("Assignment covers {actual} symbols, expected {expected}")]
    CardinalityMismatch { expected: usize, actual: usize },

    #[error("Cluster id {cluster_id} outside 1..={k}")]
    ClusterOutOfRange { cluster_id: usize, k: usize },
}

/// Per-cluster forecasting failures. Other clusters are unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelFitError {
    #[error("Series too short: {len} observations < {required} required")]
    SeriesTooShort { len: usize, required: usize },

    #[error("Series is constant, no model can be identified")]
    ConstantSeries,

    #[error("Series contains non-finite values")]
    NonFiniteValues,

    #[error("Inadmissible ARIMA({p},{d},{q}): {reason}")]
    Inadmissible {
        p: usize,
        d: usize,
        q: usize,
        reason: String,
    },

    #[error("No admissible model found among {candidates} candidates")]
    NoAdmissibleModel { candidates: usize },

    #[error("Forecast produced non-finite values")]
    NonFiniteForecast,
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error("Dimensionality reduction failed: {reason}")]
    Reduction { reason: String },
}
