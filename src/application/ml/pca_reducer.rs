use crate::domain::errors::PipelineError;
use crate::domain::ml::feature_registry::{FEATURE_NAMES, features_to_f64_vector};
use crate::domain::performance::Stats;
use crate::domain::types::{FeatureRow, ReducedPoint};
use ndarray::{Array2, Axis};
use serde::Serialize;
use smartcore::decomposition::pca::{PCA, PCAParameters};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::{info, warn};

/// Number of principal components kept per row.
pub const N_COMPONENTS: usize = 2;

/// Mean and sample stdev used to standardize one feature column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: &'static str,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReductionSummary {
    pub rows: usize,
    pub column_stats: Vec<ColumnStats>,
    /// Share of total standardized variance carried by each component.
    pub explained_variance_ratio: [f64; N_COMPONENTS],
}

#[derive(Debug, Clone)]
pub struct Reduction {
    pub points: Vec<ReducedPoint>,
    pub summary: ReductionSummary,
}

/// Projects feature rows onto their top principal components after global
/// column standardization. Component signs are arbitrary.
pub struct DimensionalityReducer;

impl DimensionalityReducer {
    /// Numeric feature matrix, one row per feature row, columns in `FEATURE_NAMES` order.
    pub fn feature_matrix(rows: &[FeatureRow]) -> Result<Array2<f64>, PipelineError> {
        let flat: Vec<f64> = rows.iter().flat_map(features_to_f64_vector).collect();
        Array2::from_shape_vec((rows.len(), FEATURE_NAMES.len()), flat).map_err(|e| {
            PipelineError::Reduction {
                reason: format!("Feature matrix shape error: {}", e),
            }
        })
    }

    /// Standardizes every column to zero mean and unit sample variance.
    ///
    /// Columns without dispersion are only centred.
    pub fn standardize(matrix: &Array2<f64>) -> (Array2<f64>, Vec<ColumnStats>) {
        let mut standardized = matrix.clone();
        let mut stats = Vec::with_capacity(matrix.ncols());

        for (j, mut column) in standardized.axis_iter_mut(Axis(1)).enumerate() {
            let values = column.to_vec();
            let mean = Stats::mean(&values).unwrap_or(0.0);
            let std_dev = Stats::sample_std_dev(&values);
            let name = FEATURE_NAMES.get(j).copied().unwrap_or("unnamed");

            if std_dev > f64::EPSILON {
                column.mapv_inplace(|x| (x - mean) / std_dev);
            } else {
                warn!("Feature column {} has no dispersion, centring only", name);
                column.mapv_inplace(|x| x - mean);
            }
            stats.push(ColumnStats {
                name,
                mean,
                std_dev,
            });
        }

        (standardized, stats)
    }

    /// Reduces all feature rows to two principal components.
    pub fn reduce(rows: &[FeatureRow]) -> Result<Reduction, PipelineError> {
        if rows.len() <= N_COMPONENTS {
            return Err(PipelineError::Reduction {
                reason: format!(
                    "Need more than {} rows for {} components, got {}",
                    N_COMPONENTS,
                    N_COMPONENTS,
                    rows.len()
                ),
            });
        }

        let matrix = Self::feature_matrix(rows)?;
        let (standardized, column_stats) = Self::standardize(&matrix);

        let total_variance: f64 = standardized
            .axis_iter(Axis(1))
            .map(|c| Stats::sample_std_dev(&c.to_vec()).powi(2))
            .sum();
        if total_variance <= f64::EPSILON {
            return Err(PipelineError::Reduction {
                reason: "All feature columns are constant".to_string(),
            });
        }

        let dense_rows: Vec<Vec<f64>> = standardized.outer_iter().map(|r| r.to_vec()).collect();
        let dense = DenseMatrix::from_2d_vec(&dense_rows).map_err(|e| PipelineError::Reduction {
            reason: format!("Matrix creation failed: {}", e),
        })?;

        let pca: PCA<f64, DenseMatrix<f64>> = PCA::fit(
            &dense,
            PCAParameters::default().with_n_components(N_COMPONENTS),
        )
        .map_err(|e| PipelineError::Reduction {
            reason: format!("PCA fit failed: {}", e),
        })?;
        let projected = pca.transform(&dense).map_err(|e| PipelineError::Reduction {
            reason: format!("PCA transform failed: {}", e),
        })?;

        let points: Vec<ReducedPoint> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| ReducedPoint {
                symbol: row.symbol.clone(),
                date: row.date,
                component_1: *projected.get((i, 0)),
                component_2: *projected.get((i, 1)),
            })
            .collect();

        let mut explained_variance_ratio = [0.0; N_COMPONENTS];
        for (c, ratio) in explained_variance_ratio.iter_mut().enumerate() {
            let component: Vec<f64> = (0..rows.len()).map(|i| *projected.get((i, c))).collect();
            *ratio = Stats::sample_std_dev(&component).powi(2) / total_variance;
        }

        info!(
            "Reduced {} rows x {} features to {} components (explained variance {:.1}% / {:.1}%)",
            rows.len(),
            FEATURE_NAMES.len(),
            N_COMPONENTS,
            explained_variance_ratio[0] * 100.0,
            explained_variance_ratio[1] * 100.0
        );

        Ok(Reduction {
            points,
            summary: ReductionSummary {
                rows: rows.len(),
                column_stats,
                explained_variance_ratio,
            },
        })
    }
}
