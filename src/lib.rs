//! RfmForge: customer segmentation from transaction logs using RFM analysis
//!
//! Each customer is reduced to Recency, Frequency and Monetary metrics,
//! scored into rank-based quintiles and mapped to a named marketing segment.

pub mod cli;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod rfm;
pub mod score;
pub mod segment;
pub mod summary;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{export_segments, load_transactions, Transaction};
pub use error::{RfmError, RfmResult};
pub use pipeline::{run_segmentation, SegmentationConfig, SegmentationReport};
pub use rfm::{compute_rfm, default_snapshot_date, CustomerId, RfmRecord};
pub use score::{score_records, RfmScores, ScoredRecord, SCORE_BUCKETS};
pub use segment::{segment_records, Segment, SegmentClassifier, SegmentedRecord};
pub use summary::{summarize_segments, SegmentSummaryRow};
pub use viz::generate_segment_report;

/// Common result type used by the I/O and CLI layers
pub type Result<T> = anyhow::Result<T>;
