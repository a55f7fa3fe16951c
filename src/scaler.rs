//! Column standardization to zero mean and unit variance

use crate::error::{SegmentError, SegmentResult};
use crate::features::RfmTable;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;

/// Fitted per-column scaling parameters
///
/// `std` holds the divisor actually applied: columns whose population
/// standard deviation is zero (or within rounding of zero) carry 1.0 and are
/// flagged in `degenerate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
    pub degenerate: Vec<bool>,
}

impl StandardScaler {
    /// Fit population mean and standard deviation (divisor N) per column
    pub fn fit(data: &ArrayView2<f64>) -> Self {
        let n_features = data.ncols();
        if data.nrows() == 0 {
            return Self {
                mean: Array1::zeros(n_features),
                std: Array1::ones(n_features),
                degenerate: vec![false; n_features],
            };
        }

        let mean = data
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let raw_std = data.std_axis(Axis(0), 0.0);

        let mut degenerate = Vec::with_capacity(n_features);
        let std = raw_std
            .iter()
            .zip(mean.iter())
            .enumerate()
            .map(|(col, (&s, &m))| {
                let is_degenerate = !(s > zero_variance_threshold(m));
                if is_degenerate {
                    tracing::debug!(column = col, mean = m, "zero-variance column, scale set to 1.0");
                }
                degenerate.push(is_degenerate);
                if is_degenerate {
                    1.0
                } else {
                    s
                }
            })
            .collect::<Array1<f64>>();

        Self {
            mean,
            std,
            degenerate,
        }
    }

    /// Apply `(x - mean) / std` elementwise
    pub fn transform(&self, data: &ArrayView2<f64>) -> SegmentResult<Array2<f64>> {
        self.check_width(data.ncols())?;
        Ok((data - &self.mean) / &self.std)
    }

    /// Undo the scaling: `z * std + mean`
    pub fn inverse_transform(&self, data: &ArrayView2<f64>) -> SegmentResult<Array2<f64>> {
        self.check_width(data.ncols())?;
        Ok(data * &self.std + &self.mean)
    }

    /// Scale a single observation
    pub fn transform_one(&self, point: &ArrayView1<f64>) -> SegmentResult<Array1<f64>> {
        self.check_width(point.len())?;
        Ok((point - &self.mean) / &self.std)
    }

    fn check_width(&self, width: usize) -> SegmentResult<()> {
        if width != self.mean.len() {
            return Err(SegmentError::invalid_parameter(format!(
                "expected {} features, got {}",
                self.mean.len(),
                width
            )));
        }
        Ok(())
    }
}

fn zero_variance_threshold(mean: f64) -> f64 {
    10.0 * f64::EPSILON * mean.abs().max(1.0)
}

/// Standardized feature matrix together with the parameters that produced it
#[derive(Debug, Clone)]
pub struct Standardized {
    /// (n_customers, 3) in column order Recency, Frequency, Monetary
    pub matrix: Array2<f64>,
    pub scaler: StandardScaler,
}

/// Standardize the RFM table column by column
pub fn standardize(rfm: &RfmTable) -> Standardized {
    let raw = rfm.to_matrix();
    let scaler = StandardScaler::fit(&raw.view());
    let matrix = (&raw - &scaler.mean) / &scaler.std;
    Standardized { matrix, scaler }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{CustomerId, RfmRecord};
    use ndarray::{array, Array2};

    fn table(values: &[(i64, usize, f64)]) -> RfmTable {
        RfmTable {
            records: values
                .iter()
                .enumerate()
                .map(|(i, &(recency, frequency, monetary))| RfmRecord {
                    customer_id: CustomerId::new(i.to_string()),
                    recency,
                    frequency,
                    monetary,
                })
                .collect(),
            snapshot: None,
        }
    }

    #[test]
    fn test_population_statistics() {
        let rfm = table(&[(1, 1, 10.0), (3, 2, 20.0), (5, 3, 60.0)]);
        let out = standardize(&rfm);

        assert!((out.scaler.mean[0] - 3.0).abs() < 1e-12);
        // population std of [1, 3, 5] = sqrt(8/3)
        assert!((out.scaler.std[0] - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);

        for col in out.matrix.columns() {
            let mean = col.sum() / col.len() as f64;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_variance_column_becomes_zeros() {
        let rfm = table(&[(1, 1, 10.0), (3, 1, 20.0), (5, 1, 60.0)]);
        let out = standardize(&rfm);

        assert_eq!(out.scaler.degenerate, vec![false, true, false]);
        assert_eq!(out.scaler.std[1], 1.0);
        assert!(out.matrix.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_round_trip() {
        let rfm = table(&[(12, 4, 310.5), (1, 1, -20.0), (300, 17, 9000.25), (45, 2, 0.0)]);
        let raw = rfm.to_matrix();
        let out = standardize(&rfm);
        let restored = out.scaler.inverse_transform(&out.matrix.view()).unwrap();

        for (a, b) in raw.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} != {b}");
        }
    }

    #[test]
    fn test_transform_one_matches_fit() {
        let rfm = table(&[(1, 1, 10.0), (3, 2, 20.0), (5, 3, 60.0)]);
        let out = standardize(&rfm);
        let scaled = out
            .scaler
            .transform_one(&array![3.0, 2.0, 30.0].view())
            .unwrap();

        assert!(scaled[0].abs() < 1e-12);
        assert!(scaled[1].abs() < 1e-12);
        assert_eq!(out.matrix.row(1)[0], scaled[0]);
    }

    #[test]
    fn test_transform_applies_fitted_parameters() {
        let raw = array![[2.0, 10.0, 100.0], [4.0, 30.0, 300.0]];
        let scaler = StandardScaler::fit(&raw.view());
        let scaled = scaler.transform(&array![[3.0, 20.0, 200.0]].view()).unwrap();

        assert_eq!(scaled.row(0).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let scaler = StandardScaler::fit(&Array2::<f64>::zeros((2, 3)).view());
        assert!(scaler.transform_one(&array![1.0, 2.0].view()).is_err());
    }

    #[test]
    fn test_empty_table() {
        let out = standardize(&RfmTable::default());
        assert_eq!(out.matrix.shape(), &[0, 3]);
        assert_eq!(out.scaler.std.to_vec(), vec![1.0, 1.0, 1.0]);
    }
}
