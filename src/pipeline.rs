//! End-to-end segmentation: aggregate, score, classify, summarize

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::data::Transaction;
use crate::error::{RfmError, RfmResult};
use crate::rfm::{compute_rfm, default_snapshot_date, CustomerId};
use crate::score::{score_records, SCORE_BUCKETS};
use crate::segment::{segment_records, SegmentClassifier, SegmentedRecord};
use crate::summary::{summarize_segments, SegmentSummaryRow};

/// Run parameters
#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    /// Reference date for recency; defaults to the day after the latest transaction
    pub snapshot_date: Option<NaiveDateTime>,
    /// Number of score buckets per metric
    pub buckets: usize,
    pub classifier: SegmentClassifier,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            snapshot_date: None,
            buckets: SCORE_BUCKETS,
            classifier: SegmentClassifier::default(),
        }
    }
}

impl SegmentationConfig {
    pub fn with_snapshot_date(mut self, snapshot_date: NaiveDateTime) -> Self {
        self.snapshot_date = Some(snapshot_date);
        self
    }
}

/// Output of a complete run
#[derive(Debug, Clone)]
pub struct SegmentationReport {
    pub snapshot_date: NaiveDateTime,
    /// One row per customer, ordered by customer id
    pub records: Vec<SegmentedRecord>,
    pub summary: Vec<SegmentSummaryRow>,
}

impl SegmentationReport {
    pub fn customer_count(&self) -> usize {
        self.records.len()
    }

    /// Look up one customer's segmented record
    pub fn find(&self, customer_id: CustomerId) -> Option<&SegmentedRecord> {
        self.records
            .binary_search_by_key(&customer_id, |r| r.scored.rfm.customer_id)
            .ok()
            .map(|idx| &self.records[idx])
    }
}

/// Segment every customer in the transaction set
///
/// Either every customer receives a complete record or the run fails.
pub fn run_segmentation(
    transactions: &[Transaction],
    config: &SegmentationConfig,
) -> RfmResult<SegmentationReport> {
    let snapshot_date = match config.snapshot_date {
        Some(date) => date,
        None => default_snapshot_date(transactions)
            .ok_or_else(|| RfmError::Data("no transactions to segment".to_string()))?,
    };
    info!(%snapshot_date, transactions = transactions.len(), "starting segmentation");

    let rfm = compute_rfm(transactions, snapshot_date)?;
    debug!(customers = rfm.len(), "computed RFM table");

    let scored = score_records(rfm, config.buckets)?;
    debug!(buckets = config.buckets, "scored metrics");

    // score_records has already bounded buckets to u8
    let gaps = config.classifier.coverage_gaps(config.buckets as u8);
    if !gaps.is_empty() {
        warn!(?gaps, "segment rules do not partition the score grid");
    }

    let records = segment_records(scored, &config.classifier)?;
    let summary = summarize_segments(&records);
    info!(
        customers = records.len(),
        segments = summary.len(),
        "segmentation complete"
    );

    Ok(SegmentationReport {
        snapshot_date,
        records,
        summary,
    })
}
