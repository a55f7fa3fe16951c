//! Per-cluster aggregation of RFM values

use crate::error::{SegmentError, SegmentResult};
use crate::features::{RfmRecord, RfmTable};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate RFM statistics for one cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub mean_recency: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
    pub customers: usize,
}

#[derive(Default)]
struct Totals {
    recency: f64,
    frequency: f64,
    monetary: f64,
    count: usize,
}

/// Group customers by label and average their RFM values
///
/// Output is ordered by ascending label; labels without members do not appear.
pub fn summarize(rfm: &RfmTable, labels: &[usize]) -> SegmentResult<Vec<ClusterSummary>> {
    if rfm.len() != labels.len() {
        return Err(SegmentError::invalid_parameter(format!(
            "{} labels supplied for {} customers",
            labels.len(),
            rfm.len()
        )));
    }

    let mut groups: BTreeMap<usize, Totals> = BTreeMap::new();
    for (record, &label) in rfm.records.iter().zip(labels) {
        let totals = groups.entry(label).or_default();
        totals.recency += record.recency as f64;
        totals.frequency += record.frequency as f64;
        totals.monetary += record.monetary;
        totals.count += 1;
    }

    Ok(groups
        .into_iter()
        .map(|(cluster, t)| {
            let n = t.count as f64;
            ClusterSummary {
                cluster,
                mean_recency: t.recency / n,
                mean_frequency: t.frequency / n,
                mean_monetary: t.monetary / n,
                customers: t.count,
            }
        })
        .collect())
}

/// One customer's RFM values with its cluster label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentedCustomer {
    #[serde(flatten)]
    pub rfm: RfmRecord,
    pub cluster: usize,
}

/// Join the RFM table with its labels, row by row
pub fn label_customers(rfm: &RfmTable, labels: &[usize]) -> SegmentResult<Vec<SegmentedCustomer>> {
    if rfm.len() != labels.len() {
        return Err(SegmentError::invalid_parameter(format!(
            "{} labels supplied for {} customers",
            labels.len(),
            rfm.len()
        )));
    }
    Ok(rfm
        .records
        .iter()
        .zip(labels)
        .map(|(record, &cluster)| SegmentedCustomer {
            rfm: record.clone(),
            cluster,
        })
        .collect())
}
