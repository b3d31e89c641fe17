use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Cluster identifiers run from 1 to k.
pub type ClusterId = usize;

/// One raw row as delivered by the data source. Every field may be missing;
/// validation turns it into a [`PriceObservation`] or a data-quality issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub symbol: Option<String>,
    pub date: Option<NaiveDate>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// Daily OHLCV bar for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A price observation enriched with rolling features. Only rows whose
/// rolling windows are completely filled exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Close-to-close return in percent.
    pub daily_return: f64,
    /// Sample standard deviation of `daily_return` over the volatility window.
    pub volatility: f64,
    pub ma_short: f64,
    pub ma_long: f64,
    pub high_low_range: f64,
    /// Volume z-scored over the symbol's full history.
    pub normalized_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedPoint {
    pub symbol: String,
    pub date: NaiveDate,
    pub component_1: f64,
    pub component_2: f64,
}

/// Date-ordered reduced trajectory of one symbol; the unit of clustering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetSeries {
    pub symbol: String,
    pub points: Vec<ReducedPoint>,
}

impl AssetSeries {
    /// Groups reduced points into one series per symbol, ordered by symbol
    /// and, within a symbol, by date.
    pub fn group_by_symbol(points: Vec<ReducedPoint>) -> Vec<AssetSeries> {
        let mut grouped: BTreeMap<String, Vec<ReducedPoint>> = BTreeMap::new();
        for point in points {
            grouped.entry(point.symbol.clone()).or_default().push(point);
        }

        grouped
            .into_iter()
            .map(|(symbol, mut points)| {
                points.sort_by_key(|p| p.date);
                AssetSeries { symbol, points }
            })
            .collect()
    }

    /// The trajectory as 2D coordinates.
    pub fn coordinates(&self) -> Vec<[f64; 2]> {
        self.points
            .iter()
            .map(|p| [p.component_1, p.component_2])
            .collect()
    }
}

/// Symbol to cluster mapping produced by one clustering run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    k: usize,
    clusters: BTreeMap<String, ClusterId>,
}

impl ClusterAssignment {
    pub fn new(k: usize, clusters: BTreeMap<String, ClusterId>) -> Self {
        Self { k, clusters }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn cluster_of(&self, symbol: &str) -> Option<ClusterId> {
        self.clusters.get(symbol).copied()
    }

    /// Symbols of one cluster in lexicographic order.
    pub fn members(&self, cluster_id: ClusterId) -> Vec<&str> {
        self.clusters
            .iter()
            .filter(|(_, c)| **c == cluster_id)
            .map(|(s, _)| s.as_str())
            .collect()
    }

    /// All cluster ids 1..=k, including any that ended up without members.
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        (1..=self.k).collect()
    }

    pub fn cluster_sizes(&self) -> BTreeMap<ClusterId, usize> {
        let mut sizes: BTreeMap<ClusterId, usize> =
            self.cluster_ids().into_iter().map(|c| (c, 0)).collect();
        for cluster_id in self.clusters.values() {
            *sizes.entry(*cluster_id).or_insert(0) += 1;
        }
        sizes
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ClusterId)> {
        self.clusters.iter().map(|(s, c)| (s.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

/// Trailing-window statistics of the pooled daily returns of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterPerformance {
    pub cluster_id: ClusterId,
    /// Compounded return of all pooled rows, as a fraction.
    pub cumulative_return: f64,
    pub volatility: f64,
    pub momentum: f64,
    /// Number of pooled rows.
    pub observations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationLabel {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for RecommendationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationLabel::Buy => write!(f, "Buy"),
            RecommendationLabel::Sell => write!(f, "Sell"),
            RecommendationLabel::Hold => write!(f, "Hold"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub cluster_id: ClusterId,
    pub label: RecommendationLabel,
    pub overall_score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub mean_close: f64,
}

/// Daily cross-sectional mean close of a cluster's members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterTimeSeries {
    pub cluster_id: ClusterId,
    pub points: Vec<SeriesPoint>,
}

impl ClusterTimeSeries {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean_close).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

/// The model the automatic search settled on for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal_d: usize,
    pub period: usize,
    pub include_constant: bool,
    pub aicc: f64,
    pub sigma2: f64,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.seasonal_d > 0 {
            write!(f, "(0,{},0)[{}]", self.seasonal_d, self.period)?;
        }
        if self.include_constant {
            write!(f, " with mean/drift")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point_forecast: f64,
    pub lower_80: f64,
    pub upper_80: f64,
    pub lower_95: f64,
    pub upper_95: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub cluster_id: ClusterId,
    pub model: ModelSummary,
    pub points: Vec<ForecastPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(symbol: &str, day: u32) -> ReducedPoint {
        ReducedPoint {
            symbol: symbol.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            component_1: day as f64,
            component_2: -(day as f64),
        }
    }

    #[test]
    fn test_group_by_symbol_orders_dates() {
        let points = vec![point("ETH", 3), point("BTC", 2), point("ETH", 1), point("BTC", 1)];
        let series = AssetSeries::group_by_symbol(points);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].symbol, "BTC");
        assert_eq!(series[1].coordinates(), vec![[1.0, -1.0], [3.0, -3.0]]);
    }

    #[test]
    fn test_cluster_sizes_include_empty_clusters() {
        let mut map = BTreeMap::new();
        map.insert("BTC".to_string(), 1);
        map.insert("ETH".to_string(), 1);
        let assignment = ClusterAssignment::new(2, map);

        let sizes = assignment.cluster_sizes();
        assert_eq!(sizes[&1], 2);
        assert_eq!(sizes[&2], 0);
        assert_eq!(assignment.members(1), vec!["BTC", "ETH"]);
    }

    #[test]
    fn test_model_summary_display() {
        let summary = ModelSummary {
            p: 1,
            d: 1,
            q: 2,
            seasonal_d: 1,
            period: 365,
            include_constant: false,
            aicc: 0.0,
            sigma2: 1.0,
        };
        assert_eq!(summary.to_string(), "ARIMA(1,1,2)(0,1,0)[365]");
    }
}
