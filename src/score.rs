//! Rank-based quantile scoring of RFM metrics
//!
//! Every metric column is ranked independently with a total order (metric
//! value, then customer id) and the rank sequence is cut into `buckets`
//! contiguous groups whose sizes differ by at most one. Raw-value quantile
//! boundaries are never used, so heavily tied columns still fill every bucket.

use std::cmp::Ordering;

use crate::error::{RfmError, RfmResult};
use crate::rfm::RfmRecord;

/// Number of score buckets (quintiles) used by the segmentation pipeline
pub const SCORE_BUCKETS: usize = 5;

/// The three scored metric columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Recency, Metric::Frequency, Metric::Monetary];

    fn value(self, record: &RfmRecord) -> f64 {
        match self {
            Metric::Recency => record.recency as f64,
            Metric::Frequency => record.frequency as f64,
            Metric::Monetary => record.monetary,
        }
    }

    /// Recency is inverted: the most recent customers get the top score
    fn inverted(self) -> bool {
        matches!(self, Metric::Recency)
    }
}

/// Ordinal scores in `1..=buckets`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RfmScores {
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
}

impl RfmScores {
    pub fn get(&self, metric: Metric) -> u8 {
        match metric {
            Metric::Recency => self.recency,
            Metric::Frequency => self.frequency,
            Metric::Monetary => self.monetary,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub rfm: RfmRecord,
    pub scores: RfmScores,
}

fn rank_order(records: &[RfmRecord], metric: Metric) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| compare_by_rank(&records[a], &records[b], metric).then(a.cmp(&b)));
    order
}

fn check_buckets(customers: usize, buckets: usize) -> RfmResult<()> {
    if buckets == 0 || buckets > u8::MAX as usize {
        return Err(RfmError::InvalidBucketCount(buckets));
    }
    if customers < buckets {
        return Err(RfmError::InsufficientData { customers, buckets });
    }
    Ok(())
}

/// Group in `1..=buckets` for the 0-based `rank` among `customers`
///
/// Ranks are cut at `1 + (N - 1) * j / K` for j in 1..=K, each group holding
/// the ranks above the previous cut up to and including its own. This is the
/// smallest j with `rank * K <= (N - 1) * j`.
fn quantile_group(rank: usize, customers: usize, buckets: usize) -> usize {
    if customers <= 1 {
        return 1;
    }
    (rank * buckets).div_ceil(customers - 1).max(1)
}

/// Score one metric column, returning one score per record in input order
///
/// # Arguments
/// * `records` - Aggregated RFM records
/// * `metric` - Column to score
/// * `buckets` - Number of ordinal buckets
///
/// # Returns
/// * Scores in `1..=buckets`; fails with `InsufficientData` when there are
///   fewer records than buckets
pub fn score_metric(records: &[RfmRecord], metric: Metric, buckets: usize) -> RfmResult<Vec<u8>> {
    let customers = records.len();
    check_buckets(customers, buckets)?;

    let mut scores = vec![0u8; customers];
    for (rank, idx) in rank_order(records, metric).into_iter().enumerate() {
        let group = quantile_group(rank, customers, buckets);
        let score = if metric.inverted() {
            buckets + 1 - group
        } else {
            group
        };
        scores[idx] = score as u8;
    }

    Ok(scores)
}

/// Attach recency, frequency and monetary scores to every record
pub fn score_records(records: Vec<RfmRecord>, buckets: usize) -> RfmResult<Vec<ScoredRecord>> {
    let recency = score_metric(&records, Metric::Recency, buckets)?;
    let frequency = score_metric(&records, Metric::Frequency, buckets)?;
    let monetary = score_metric(&records, Metric::Monetary, buckets)?;

    Ok(records
        .into_iter()
        .enumerate()
        .map(|(i, rfm)| ScoredRecord {
            rfm,
            scores: RfmScores {
                recency: recency[i],
                frequency: frequency[i],
                monetary: monetary[i],
            },
        })
        .collect())
}

/// Compare two records by a metric's rank order
pub fn compare_by_rank(left: &RfmRecord, right: &RfmRecord, metric: Metric) -> Ordering {
    metric
        .value(left)
        .total_cmp(&metric.value(right))
        .then_with(|| left.customer_id.cmp(&right.customer_id))
}
