//! Error types for the segmentation library

use thiserror::Error;

/// Errors raised by ingestion and the segmentation core
#[derive(Debug, Error)]
pub enum SegmentError {
    /// A caller-supplied parameter is outside its valid range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The input table lacks one or more required columns
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A data row could not be converted into a transaction
    #[error("invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    /// The CSV reader failed
    #[error("csv error: {0}")]
    Csv(#[from] polars::prelude::PolarsError),
}

impl SegmentError {
    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Result alias for library operations
pub type SegmentResult<T> = std::result::Result<T, SegmentError>;
