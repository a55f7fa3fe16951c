//! End-to-end segmentation run: RFM, standardization, K-Means, summary

use crate::error::SegmentResult;
use crate::features::{build_rfm, RfmTable, TransactionRow};
use crate::model::{fit_kmeans, KMeansModel, KMeansParams};
use crate::scaler::{standardize, StandardScaler};
use crate::summary::{label_customers, summarize, ClusterSummary, SegmentedCustomer};
use ndarray::{Array1, Array2};

/// Everything produced by one segmentation run
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub rfm: RfmTable,
    pub standardized: Array2<f64>,
    pub scaler: StandardScaler,
    /// `None` when the input held no customers
    pub model: Option<KMeansModel>,
    pub summaries: Vec<ClusterSummary>,
}

impl Segmentation {
    fn empty(rfm: RfmTable, standardized: Array2<f64>, scaler: StandardScaler) -> Self {
        Self {
            rfm,
            standardized,
            scaler,
            model: None,
            summaries: Vec::new(),
        }
    }

    /// True when there were no customers to segment
    pub fn is_empty(&self) -> bool {
        self.rfm.is_empty()
    }

    pub fn labels(&self) -> &[usize] {
        self.model.as_ref().map(|m| m.labels.as_slice()).unwrap_or(&[])
    }

    /// RFM rows joined with their cluster label
    pub fn customers(&self) -> SegmentResult<Vec<SegmentedCustomer>> {
        label_customers(&self.rfm, self.labels())
    }

    /// Assign raw (unscaled) R, F, M values to the nearest fitted cluster
    ///
    /// Returns `None` for an empty segmentation.
    pub fn predict(&self, rfm_values: &[f64; 3]) -> SegmentResult<Option<usize>> {
        let Some(model) = &self.model else {
            return Ok(None);
        };
        let raw = Array1::from(rfm_values.to_vec());
        let scaled = self.scaler.transform_one(&raw.view())?;
        model.predict(&scaled.view()).map(Some)
    }
}

/// Run the full pipeline over cleaned transaction rows
///
/// Zero customers is a valid, empty outcome rather than an error; an
/// out-of-range cluster count is not.
#[tracing::instrument(skip_all, fields(rows = rows.len(), k = params.n_clusters, seed = params.seed))]
pub fn run_segmentation(rows: &[TransactionRow], params: &KMeansParams) -> SegmentResult<Segmentation> {
    let rfm = build_rfm(rows);
    let standardized = standardize(&rfm);

    if rfm.is_empty() {
        tracing::info!("no customers in input, returning empty segmentation");
        return Ok(Segmentation::empty(rfm, standardized.matrix, standardized.scaler));
    }

    let model = fit_kmeans(&standardized.matrix.view(), params)?;
    tracing::info!(
        customers = rfm.len(),
        iterations = model.n_iter,
        converged = model.converged,
        inertia = model.inertia,
        "k-means fitted"
    );

    let summaries = summarize(&rfm, &model.labels)?;

    Ok(Segmentation {
        rfm,
        standardized: standardized.matrix,
        scaler: standardized.scaler,
        model: Some(model),
        summaries,
    })
}
