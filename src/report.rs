//! Text and JSON rendering of a segmentation result

use crate::model::KMeansParams;
use crate::pipeline::Segmentation;
use crate::summary::{ClusterSummary, SegmentedCustomer};
use serde::Serialize;
use std::fmt::Write;

/// Serializable view of one run
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub params: &'a KMeansParams,
    pub customers: usize,
    pub snapshot: Option<String>,
    pub iterations: Option<usize>,
    pub converged: Option<bool>,
    pub inertia: Option<f64>,
    pub summary: &'a [ClusterSummary],
    pub segments: Vec<SegmentedCustomer>,
}

impl<'a> Report<'a> {
    pub fn new(segmentation: &'a Segmentation, params: &'a KMeansParams) -> crate::Result<Self> {
        let model = segmentation.model.as_ref();
        Ok(Self {
            params,
            customers: segmentation.rfm.len(),
            snapshot: segmentation.rfm.snapshot.map(|s| s.to_string()),
            iterations: model.map(|m| m.n_iter),
            converged: model.map(|m| m.converged),
            inertia: model.map(|m| m.inertia),
            summary: &segmentation.summaries,
            segments: segmentation.customers()?,
        })
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// First `limit` customers with their RFM values and cluster
pub fn format_segments(customers: &[SegmentedCustomer], limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} | {:>7} | {:>9} | {:>12} | {:>7}",
        "Customer ID", "Recency", "Frequency", "Monetary", "Cluster"
    );
    let _ = writeln!(out, "{}", "-".repeat(59));
    for c in customers.iter().take(limit) {
        let _ = writeln!(
            out,
            "{:<12} | {:>7} | {:>9} | {:>12.2} | {:>7}",
            c.rfm.customer_id, c.rfm.recency, c.rfm.frequency, c.rfm.monetary, c.cluster
        );
    }
    out
}

/// Cluster summary table, one row per label
pub fn format_summary(summaries: &[ClusterSummary]) -> String {
    let total: usize = summaries.iter().map(|s| s.customers).sum();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>7} | {:>11} | {:>13} | {:>12} | {:>9} | {:>6}",
        "Cluster", "Avg_Recency", "Avg_Frequency", "Avg_Monetary", "Customers", "Share"
    );
    let _ = writeln!(out, "{}", "-".repeat(74));
    for s in summaries {
        let share = if total > 0 {
            s.customers as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let _ = writeln!(
            out,
            "{:>7} | {:>11.2} | {:>13.2} | {:>12.2} | {:>9} | {:>5.1}%",
            s.cluster, s.mean_recency, s.mean_frequency, s.mean_monetary, s.customers, share
        );
    }
    out
}

/// Centroids in standardized units
pub fn format_centroids(segmentation: &Segmentation) -> String {
    let mut out = String::new();
    let Some(model) = &segmentation.model else {
        return out;
    };
    let _ = writeln!(out, "  Cluster | Recency | Frequency | Monetary");
    let _ = writeln!(out, "  --------|---------|-----------|----------");
    for (i, row) in model.centroids.outer_iter().enumerate() {
        let _ = writeln!(out, "  {:7} | {:7.2} | {:9.2} | {:8.2}", i, row[0], row[1], row[2]);
    }
    out
}
