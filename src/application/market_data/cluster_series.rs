use crate::domain::types::{ClusterAssignment, ClusterTimeSeries, FeatureRow, SeriesPoint};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Builds one daily mean-close series per cluster from rows dated on or after
/// `cutoff`. Rows of unassigned symbols are ignored. Clusters without any row
/// after the cutoff are absent from the result.
pub fn aggregate_cluster_series(
    rows: &[FeatureRow],
    assignment: &ClusterAssignment,
    cutoff: NaiveDate,
) -> Vec<ClusterTimeSeries> {
    // cluster -> date -> (sum, count)
    let mut sums: BTreeMap<usize, BTreeMap<NaiveDate, (f64, usize)>> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.date >= cutoff) {
        let Some(cluster_id) = assignment.cluster_of(&row.symbol) else {
            continue;
        };
        let entry = sums
            .entry(cluster_id)
            .or_default()
            .entry(row.date)
            .or_insert((0.0, 0));
        entry.0 += row.close;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(cluster_id, by_date)| {
            let points: Vec<SeriesPoint> = by_date
                .into_iter()
                .map(|(date, (sum, count))| SeriesPoint {
                    date,
                    mean_close: sum / count as f64,
                })
                .collect();
            debug!("Cluster {} series: {} daily points", cluster_id, points.len());
            ClusterTimeSeries { cluster_id, points }
        })
        .collect()
}
