use crate::domain::types::RawObservation;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

/// One CSV record. Unparseable cells become missing values so validation can
/// count them instead of aborting the load.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    volume: Option<f64>,
}

impl From<CsvRecord> for RawObservation {
    fn from(record: CsvRecord) -> Self {
        RawObservation {
            symbol: record.symbol.filter(|s| !s.trim().is_empty()),
            date: record.date,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        }
    }
}

/// Reads a `symbol,date,open,high,low,close,volume` table.
pub struct CsvPriceLoader;

impl CsvPriceLoader {
    pub fn load_path(path: &Path) -> Result<Vec<RawObservation>> {
        let file =
            File::open(path).context(format!("Failed to open price file: {}", path.display()))?;
        let rows = Self::load_reader(BufReader::new(file))
            .context(format!("Failed to read price file: {}", path.display()))?;
        info!("Loaded {} raw rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    pub fn load_reader<R: Read>(reader: R) -> Result<Vec<RawObservation>> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for (i, result) in rdr.deserialize::<CsvRecord>().enumerate() {
            let record = result.context(format!("Malformed CSV record {}", i + 1))?;
            rows.push(record.into());
        }
        Ok(rows)
    }
}
