//! rfmforge: customer segmentation from transaction records
//!
//! Transactions are reduced to per-customer RFM (Recency, Frequency,
//! Monetary) features, standardized, and partitioned with seeded K-Means.
//! Every stage is a pure function; the same input, K and seed always give
//! the same segments.

pub mod cli;
pub mod data;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod scaler;
pub mod summary;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_transactions, REQUIRED_COLUMNS};
pub use error::{SegmentError, SegmentResult};
pub use features::{build_rfm, CustomerId, RfmRecord, RfmTable, TransactionRow};
pub use model::{cluster, fit_kmeans, InitMethod, KMeansModel, KMeansParams};
pub use pipeline::{run_segmentation, Segmentation};
pub use scaler::{standardize, StandardScaler, Standardized};
pub use summary::{summarize, ClusterSummary, SegmentedCustomer};

/// Common result type used by the application layer
pub type Result<T> = anyhow::Result<T>;
