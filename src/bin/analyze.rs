//! Cluster analysis CLI
//!
//! Loads a daily OHLCV table, clusters the assets by the shape of their
//! reduced feature trajectories, scores each cluster and forecasts its mean
//! close price.
//!
//! # Usage
//! ```sh
//! RUST_LOG=coinclust=debug cargo run --bin analyze -- --input prices.csv --k 4
//! ```
//!
//! # Environment Variables
//! Every parameter can also come from the environment (or a `.env` file), for
//! example `CLUSTER_COUNT`, `CLUSTER_SEED`, `FORECAST_HORIZON`, `FORECAST_CUTOFF`.
//! A `--config` TOML file replaces the environment entirely; command-line
//! overrides apply last.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use coinclust::application::pipeline::AnalysisPipeline;
use coinclust::application::reporting::ClusterReporter;
use coinclust::config::PipelineConfig;
use coinclust::infrastructure::CsvPriceLoader;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Crypto price clustering and forecasting", long_about = None)]
struct Cli {
    /// CSV file with columns symbol,date,open,high,low,close,volume
    #[arg(short, long)]
    input: PathBuf,

    /// Output JSON file for the full report
    #[arg(short, long, default_value = "cluster_report.json")]
    output: String,

    /// TOML file with pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of clusters
    #[arg(long)]
    k: Option<usize>,

    /// Seed for the initial medoid selection
    #[arg(long)]
    seed: Option<u64>,

    /// Days to forecast
    #[arg(long)]
    horizon: Option<usize>,

    /// First date (YYYY-MM-DD) of the history used for forecasting
    #[arg(long)]
    cutoff: Option<String>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        "Configuration: k={}, seed={}, windows {}/{}/{}, horizon {}, cutoff {}",
        config.clustering.k,
        config.clustering.seed,
        config.features.volatility_window,
        config.features.short_ma_window,
        config.features.long_ma_window,
        config.forecast.horizon,
        config.forecast.history_cutoff
    );

    let reporter = ClusterReporter::default();
    reporter.print_header(
        &cli.input.display().to_string(),
        config.clustering.k,
        config.clustering.seed,
        &cli.output,
    );

    let pipeline = AnalysisPipeline::new(config).context("Invalid pipeline configuration")?;
    let raw = CsvPriceLoader::load_path(&cli.input)?;

    println!("🚀 Running analysis...\n");
    let report = pipeline.run(raw).context("Analysis run aborted")?;

    reporter.print_data_quality(&report);
    reporter.print_clusters(&report);
    reporter.print_forecasts(&report);
    reporter.export_json(&report, &cli.output)?;
    println!("✅ Analysis complete!\n");

    Ok(())
}

/// Builds the configuration from the TOML file or the environment, then
/// applies command-line overrides.
fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading pipeline config from: {}", path.display());
            PipelineConfig::from_toml_file(path)?
        }
        None => PipelineConfig::from_env()?,
    };

    if let Some(k) = cli.k {
        config.clustering.k = k;
    }
    if let Some(seed) = cli.seed {
        config.clustering.seed = seed;
    }
    if let Some(horizon) = cli.horizon {
        config.forecast.horizon = horizon;
    }
    if let Some(cutoff) = &cli.cutoff {
        config.forecast.history_cutoff = NaiveDate::parse_from_str(cutoff, "%Y-%m-%d")
            .context(format!("Invalid cutoff date format: {}", cutoff))?;
    }
    Ok(config)
}
