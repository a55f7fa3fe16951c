//! RFM (Recency, Frequency, Monetary) feature derivation from transaction rows

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Opaque customer identifier
///
/// Purely numeric identifiers order numerically and sort before any
/// non-numeric identifier; the rest order lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric_key(&self) -> Option<i128> {
        self.0.parse::<i128>().ok()
    }
}

impl Ord for CustomerId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric_key(), other.numeric_key()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for CustomerId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One cleaned transaction line
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub customer_id: CustomerId,
    pub invoice_id: String,
    pub invoice_timestamp: NaiveDateTime,
    pub quantity: f64,
    pub unit_price: f64,
}

impl TransactionRow {
    pub fn line_total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// RFM values for one customer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmRecord {
    pub customer_id: CustomerId,
    /// Whole days between the snapshot and the customer's latest invoice
    pub recency: i64,
    /// Distinct invoices
    pub frequency: usize,
    /// Sum of line totals, negative when returns dominate
    pub monetary: f64,
}

impl RfmRecord {
    /// Features in column order Recency, Frequency, Monetary
    pub fn features(&self) -> [f64; 3] {
        [self.recency as f64, self.frequency as f64, self.monetary]
    }
}

/// Per-customer RFM table, ordered by customer id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RfmTable {
    pub records: Vec<RfmRecord>,
    /// Reference instant for recency; `None` when built from no rows
    pub snapshot: Option<NaiveDateTime>,
}

impl RfmTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, customer_id: &CustomerId) -> Option<&RfmRecord> {
        self.records
            .binary_search_by(|r| r.customer_id.cmp(customer_id))
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// Raw feature matrix (n_customers, 3)
    pub fn to_matrix(&self) -> ndarray::Array2<f64> {
        let mut matrix = ndarray::Array2::zeros((self.records.len(), 3));
        for (mut row, record) in matrix.outer_iter_mut().zip(&self.records) {
            for (cell, value) in row.iter_mut().zip(record.features()) {
                *cell = value;
            }
        }
        matrix
    }
}

#[derive(Default)]
struct CustomerAccumulator<'a> {
    last_purchase: Option<NaiveDateTime>,
    invoices: HashSet<&'a str>,
    monetary: f64,
}

/// Derive one RFM record per distinct customer
///
/// The snapshot instant is one day past the latest invoice across all rows and
/// is shared by every customer. An empty input gives an empty table.
pub fn build_rfm(rows: &[TransactionRow]) -> RfmTable {
    let Some(latest) = rows.iter().map(|r| r.invoice_timestamp).max() else {
        return RfmTable::default();
    };
    let snapshot = latest + Duration::days(1);

    let mut customers: BTreeMap<&CustomerId, CustomerAccumulator<'_>> = BTreeMap::new();
    for row in rows {
        let acc = customers.entry(&row.customer_id).or_default();
        acc.last_purchase = Some(match acc.last_purchase {
            Some(ts) => ts.max(row.invoice_timestamp),
            None => row.invoice_timestamp,
        });
        acc.invoices.insert(row.invoice_id.as_str());
        let total = row.line_total();
        if !total.is_nan() {
            acc.monetary += total;
        }
    }

    let records = customers
        .into_iter()
        .filter_map(|(customer_id, acc)| {
            let last_purchase = acc.last_purchase?;
            Some(RfmRecord {
                customer_id: customer_id.clone(),
                recency: (snapshot - last_purchase).num_days(),
                frequency: acc.invoices.len(),
                monetary: acc.monetary,
            })
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        customers = records.len(),
        rows = rows.len(),
        %snapshot,
        "built RFM table"
    );

    RfmTable {
        records,
        snapshot: Some(snapshot),
    }
}
