//! Reporting utilities for analysis runs.
//!
//! Provides formatted console output and JSON export capabilities.

use crate::application::pipeline::PipelineReport;
use crate::domain::types::ForecastResult;
use anyhow::{Context, Result};
use std::path::Path;

/// Rows shown from each end of a forecast table.
const FORECAST_PREVIEW_ROWS: usize = 3;

/// Reporter for pipeline results output.
pub struct ClusterReporter {
    output_dir: String,
}

impl ClusterReporter {
    /// Creates a new reporter with the given output directory.
    pub fn new(output_dir: &str) -> Self {
        Self {
            output_dir: output_dir.to_string(),
        }
    }

    /// Prints the header banner for the run.
    pub fn print_header(&self, input: &str, k: usize, seed: u64, output: &str) {
        println!("{}", "=".repeat(80));
        println!("🔍 CRYPTO CLUSTER ANALYSIS");
        println!("{}", "=".repeat(80));
        println!("Input:        {}", input);
        println!("Clusters:     k={} (seed {})", k, seed);
        println!("Output:       {}", output);
        println!("{}", "=".repeat(80));
    }

    pub fn print_data_quality(&self, report: &PipelineReport) {
        let quality = &report.data_quality;
        println!("\n🧹 Data Quality:");
        println!("  Raw rows:          {}", quality.rows_in);
        println!("  Rows retained:     {}", quality.rows_retained);
        println!("  Warm-up dropped:   {}", quality.warmup_rows_dropped);
        println!("  Feature rows:      {}", report.feature_rows);
        for (kind, count) in &quality.issues {
            println!("  {:<18} {}", format!("{:?}:", kind), count);
        }
        if !quality.excluded_symbols.is_empty() {
            println!("  Excluded symbols:  {:?}", quality.excluded_symbols);
        }
        let [first, second] = report.reduction.explained_variance_ratio;
        println!(
            "  PCA variance:      {:.1}% + {:.1}%",
            first * 100.0,
            second * 100.0
        );
    }

    /// Prints cluster membership with each cluster's score and label.
    pub fn print_clusters(&self, report: &PipelineReport) {
        let assignment = &report.clustering.assignment;

        println!("\n{}", "=".repeat(80));
        println!(
            "✅ CLUSTERING COMPLETE - {} iterations (converged: {}), cost {:.4}",
            report.clustering.iterations, report.clustering.converged, report.clustering.total_cost
        );
        println!("{}", "=".repeat(80));
        println!(
            "{:<7} | {:<8} | {:>9} | {:>8} | {:>9} | {:>5} | {:<6}",
            "Cluster", "Medoid", "CumRet%", "Vol%", "Mom%", "Score", "Label"
        );
        println!("{}", "-".repeat(80));

        for cluster_id in assignment.cluster_ids() {
            let medoid = report
                .clustering
                .medoids
                .get(&cluster_id)
                .map(String::as_str)
                .unwrap_or("-");
            let performance = report
                .performances
                .iter()
                .find(|p| p.cluster_id == cluster_id);
            let recommendation = report.recommendation_for(cluster_id);

            match (performance, recommendation) {
                (Some(p), Some(r)) => println!(
                    "{:<7} | {:<8} | {:>9.2} | {:>8.2} | {:>9.3} | {:>5} | {:<6}",
                    cluster_id,
                    medoid,
                    p.cumulative_return * 100.0,
                    p.volatility,
                    p.momentum,
                    r.overall_score,
                    r.label
                ),
                _ => println!("{:<7} | {:<8} | no data in performance window", cluster_id, medoid),
            }
            println!("          members: {}", assignment.members(cluster_id).join(", "));
        }
        println!("{}\n", "=".repeat(80));
    }

    /// Prints the first and last rows of every forecast, then any failures.
    pub fn print_forecasts(&self, report: &PipelineReport) {
        for forecast in report.forecasts.values() {
            self.print_forecast(forecast);
        }
        for (cluster_id, reason) in &report.forecast_failures {
            println!("❌ Cluster {} forecast omitted: {}", cluster_id, reason);
        }
    }

    fn print_forecast(&self, forecast: &ForecastResult) {
        println!(
            "📈 Cluster {} - {} ({} days)",
            forecast.cluster_id,
            forecast.model,
            forecast.points.len()
        );
        println!(
            "  {:<10} | {:>12} | {:>12} | {:>12} | {:>12} | {:>12}",
            "Date", "Forecast", "Lo 80", "Hi 80", "Lo 95", "Hi 95"
        );

        let n = forecast.points.len();
        for (i, p) in forecast.points.iter().enumerate() {
            if i == FORECAST_PREVIEW_ROWS && n > 2 * FORECAST_PREVIEW_ROWS {
                println!("  {:<10} |", "...");
            }
            if i >= FORECAST_PREVIEW_ROWS && i + FORECAST_PREVIEW_ROWS < n {
                continue;
            }
            println!(
                "  {:<10} | {:>12.4} | {:>12.4} | {:>12.4} | {:>12.4} | {:>12.4}",
                p.date, p.point_forecast, p.lower_80, p.upper_80, p.lower_95, p.upper_95
            );
        }
        println!();
    }

    /// Exports the full report to a JSON file.
    pub fn export_json(&self, report: &PipelineReport, filename: &str) -> Result<()> {
        let output_path = if filename.contains('/') || filename.contains('\\') {
            filename.to_string()
        } else {
            format!("{}/{}", self.output_dir, filename)
        };

        if let Some(parent) = Path::new(&output_path).parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {:?}", parent))?;
        }

        let json_output =
            serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;

        std::fs::write(&output_path, json_output)
            .context(format!("Failed to write report to {}", output_path))?;

        println!("💾 Report saved to: {}", output_path);
        Ok(())
    }
}

impl Default for ClusterReporter {
    fn default() -> Self {
        Self::new(".")
    }
}
