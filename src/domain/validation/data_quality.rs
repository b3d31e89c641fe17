use crate::domain::errors::{DataQualityIssue, DataQualityKind};
use crate::domain::types::{PriceObservation, RawObservation};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Counts of everything excluded on the way from raw rows to feature rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub rows_in: usize,
    pub rows_retained: usize,
    pub issues: BTreeMap<DataQualityKind, usize>,
    /// Symbols that contributed no feature row at all.
    pub excluded_symbols: BTreeSet<String>,
    /// Leading rows per symbol dropped while rolling windows fill up.
    pub warmup_rows_dropped: usize,
}

impl DataQualityReport {
    pub fn record(&mut self, issue: &DataQualityIssue) {
        warn!("Data quality: {}", issue);
        *self.issues.entry(issue.kind()).or_insert(0) += 1;
        if let DataQualityIssue::InsufficientHistory { symbol, .. } = issue {
            self.excluded_symbols.insert(symbol.clone());
        }
    }

    pub fn count(&self, kind: DataQualityKind) -> usize {
        self.issues.get(&kind).copied().unwrap_or(0)
    }

    pub fn rows_excluded(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_retained)
    }

    pub fn total_issues(&self) -> usize {
        self.issues.values().sum()
    }
}

/// Validator that turns raw rows into clean, sorted, de-duplicated observations.
///
/// Rejects rows that are incomplete or physically impossible.
pub struct ObservationValidator;

impl ObservationValidator {
    /// Validates raw rows. Returns observations sorted by (symbol, date) and a
    /// report of every excluded row.
    pub fn validate(raw: Vec<RawObservation>) -> (Vec<PriceObservation>, DataQualityReport) {
        let mut report = DataQualityReport {
            rows_in: raw.len(),
            ..Default::default()
        };

        let mut observations = Vec::with_capacity(raw.len());
        for row in raw {
            match Self::validate_row(row) {
                Ok(observation) => observations.push(observation),
                Err(issue) => report.record(&issue),
            }
        }

        // Stable sort keeps the first occurrence of a duplicate first.
        observations.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));
        let mut duplicates = Vec::new();
        observations.dedup_by(|later, earlier| {
            let duplicate = later.symbol == earlier.symbol && later.date == earlier.date;
            if duplicate {
                duplicates.push(DataQualityIssue::DuplicateObservation {
                    symbol: later.symbol.clone(),
                    date: later.date.to_string(),
                });
            }
            duplicate
        });
        for issue in &duplicates {
            report.record(issue);
        }

        report.rows_retained = observations.len();
        info!(
            "Validated {} raw rows: {} retained, {} excluded",
            report.rows_in,
            report.rows_retained,
            report.rows_excluded()
        );
        (observations, report)
    }

    /// Validates one raw row.
    pub fn validate_row(row: RawObservation) -> Result<PriceObservation, DataQualityIssue> {
        let symbol = row.symbol.clone().unwrap_or_default();
        let date_label = row
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string());
        let missing = |field: &'static str| DataQualityIssue::MissingField {
            symbol: symbol.clone(),
            date: date_label.clone(),
            field,
        };

        if symbol.trim().is_empty() {
            return Err(missing("symbol"));
        }
        let date = row.date.ok_or_else(|| missing("date"))?;
        let open = row.open.ok_or_else(|| missing("open"))?;
        let high = row.high.ok_or_else(|| missing("high"))?;
        let low = row.low.ok_or_else(|| missing("low"))?;
        let close = row.close.ok_or_else(|| missing("close"))?;
        let volume = row.volume.ok_or_else(|| missing("volume"))?;

        let observation = PriceObservation {
            symbol: symbol.trim().to_string(),
            date,
            open,
            high,
            low,
            close,
            volume,
        };
        Self::validate_observation(&observation)?;
        Ok(observation)
    }

    /// Validates a complete observation.
    pub fn validate_observation(observation: &PriceObservation) -> Result<(), DataQualityIssue> {
        let prices = [
            observation.open,
            observation.high,
            observation.low,
            observation.close,
        ];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(DataQualityIssue::NonPositivePrice {
                symbol: observation.symbol.clone(),
                date: observation.date.to_string(),
            });
        }

        if observation.low > observation.high {
            return Err(DataQualityIssue::InvertedRange {
                symbol: observation.symbol.clone(),
                date: observation.date.to_string(),
                low: observation.low,
                high: observation.high,
            });
        }

        if !observation.volume.is_finite() || observation.volume < 0.0 {
            return Err(DataQualityIssue::NegativeVolume {
                symbol: observation.symbol.clone(),
                date: observation.date.to_string(),
                volume: observation.volume,
            });
        }

        Ok(())
    }
}
