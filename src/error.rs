//! Error taxonomy for the scoring and segmentation core

use polars::prelude::PolarsError;
use thiserror::Error;

/// Fatal errors raised by the RFM core. None of them are retryable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RfmError {
    /// Aggregation input is unusable (no transactions, bad snapshot date)
    #[error("Data error: {0}")]
    Data(String),

    /// Fewer customers than score buckets
    #[error("Insufficient data: {customers} customers cannot fill {buckets} score buckets")]
    InsufficientData { customers: usize, buckets: usize },

    /// No segment rule covers the score pair
    #[error("Unmapped score: no segment rule matches R={recency}, F={frequency}")]
    UnmappedScore { recency: u8, frequency: u8 },

    #[error("Invalid bucket count: {0} (must be between 1 and 255)")]
    InvalidBucketCount(usize),

    /// The aggregation frame could not be built or evaluated
    #[error("Frame error: {0}")]
    Frame(String),
}

impl From<PolarsError> for RfmError {
    fn from(err: PolarsError) -> Self {
        RfmError::Frame(err.to_string())
    }
}

pub type RfmResult<T> = std::result::Result<T, RfmError>;
