//! Per-segment customer counts and average monetary value

use std::collections::BTreeMap;

use crate::segment::{Segment, SegmentedRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSummaryRow {
    pub segment: Segment,
    pub customer_count: usize,
    /// Mean monetary value, rounded to one decimal place
    pub avg_monetary: f64,
}

/// Halves go to the even neighbour, so 0.25 becomes 0.2
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Group records by segment, sorted by customer count descending and then
/// by segment label
pub fn summarize_segments(records: &[SegmentedRecord]) -> Vec<SegmentSummaryRow> {
    let mut groups: BTreeMap<Segment, (usize, f64)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(record.segment).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += record.scored.rfm.monetary;
    }

    let mut rows: Vec<SegmentSummaryRow> = groups
        .into_iter()
        .map(|(segment, (count, total))| SegmentSummaryRow {
            segment,
            customer_count: count,
            avg_monetary: round_one_decimal(total / count as f64),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.customer_count
            .cmp(&a.customer_count)
            .then_with(|| a.segment.label().cmp(b.segment.label()))
    });
    rows
}
