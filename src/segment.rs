//! Rule-based mapping from (R, F) scores to marketing segments

use std::fmt;

use crate::error::{RfmError, RfmResult};
use crate::score::ScoredRecord;

/// Closed set of customer segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Hibernating,
    AtRisk,
    CantLoseThem,
    AboutToSleep,
    NeedAttention,
    LoyalCustomers,
    Promising,
    NewCustomers,
    PotentialLoyalists,
    Champions,
}

impl Segment {
    pub const ALL: [Segment; 10] = [
        Segment::Hibernating,
        Segment::AtRisk,
        Segment::CantLoseThem,
        Segment::AboutToSleep,
        Segment::NeedAttention,
        Segment::LoyalCustomers,
        Segment::Promising,
        Segment::NewCustomers,
        Segment::PotentialLoyalists,
        Segment::Champions,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Segment::Hibernating => "Hibernating",
            Segment::AtRisk => "At Risk",
            Segment::CantLoseThem => "Can't Lose Them",
            Segment::AboutToSleep => "About to Sleep",
            Segment::NeedAttention => "Need Attention",
            Segment::LoyalCustomers => "Loyal Customers",
            Segment::Promising => "Promising",
            Segment::NewCustomers => "New Customers",
            Segment::PotentialLoyalists => "Potential Loyalists",
            Segment::Champions => "Champions",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Set of allowed score values, stored as a bitmask (bit n = score n)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSet(u16);

impl ScoreSet {
    /// Scores `low..=high`; scores above 15 are not representable
    pub const fn range(low: u8, high: u8) -> Self {
        let mut bits = 0u16;
        let mut score = low;
        while score <= high && score < 16 {
            bits |= 1 << score;
            score += 1;
        }
        ScoreSet(bits)
    }

    pub const fn only(score: u8) -> Self {
        Self::range(score, score)
    }

    pub fn contains(&self, score: u8) -> bool {
        score < 16 && self.0 & (1 << score) != 0
    }
}

/// A `pattern -> label` rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRule {
    pub recency: ScoreSet,
    pub frequency: ScoreSet,
    pub segment: Segment,
}

impl SegmentRule {
    pub const fn new(recency: ScoreSet, frequency: ScoreSet, segment: Segment) -> Self {
        Self {
            recency,
            frequency,
            segment,
        }
    }

    pub fn matches(&self, recency: u8, frequency: u8) -> bool {
        self.recency.contains(recency) && self.frequency.contains(frequency)
    }
}

/// Standard rule table, in priority order
pub const DEFAULT_RULES: [SegmentRule; 10] = [
    SegmentRule::new(ScoreSet::range(1, 2), ScoreSet::range(1, 2), Segment::Hibernating),
    SegmentRule::new(ScoreSet::range(1, 2), ScoreSet::range(3, 4), Segment::AtRisk),
    SegmentRule::new(ScoreSet::range(1, 2), ScoreSet::only(5), Segment::CantLoseThem),
    SegmentRule::new(ScoreSet::only(3), ScoreSet::range(1, 2), Segment::AboutToSleep),
    SegmentRule::new(ScoreSet::only(3), ScoreSet::only(3), Segment::NeedAttention),
    SegmentRule::new(ScoreSet::range(3, 4), ScoreSet::range(4, 5), Segment::LoyalCustomers),
    SegmentRule::new(ScoreSet::only(4), ScoreSet::only(1), Segment::Promising),
    SegmentRule::new(ScoreSet::only(5), ScoreSet::only(1), Segment::NewCustomers),
    SegmentRule::new(ScoreSet::range(4, 5), ScoreSet::range(2, 3), Segment::PotentialLoyalists),
    SegmentRule::new(ScoreSet::only(5), ScoreSet::range(4, 5), Segment::Champions),
];

/// First-match evaluator over an ordered rule list
#[derive(Debug, Clone)]
pub struct SegmentClassifier {
    rules: Vec<SegmentRule>,
}

impl Default for SegmentClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

impl SegmentClassifier {
    pub fn new(rules: Vec<SegmentRule>) -> Self {
        Self { rules }
    }

    /// Segment of the first rule matching the score pair
    pub fn classify(&self, recency: u8, frequency: u8) -> RfmResult<Segment> {
        self.rules
            .iter()
            .find(|rule| rule.matches(recency, frequency))
            .map(|rule| rule.segment)
            .ok_or(RfmError::UnmappedScore {
                recency,
                frequency,
            })
    }

    /// Number of rules matching a score pair, ignoring priority
    pub fn match_count(&self, recency: u8, frequency: u8) -> usize {
        self.rules
            .iter()
            .filter(|rule| rule.matches(recency, frequency))
            .count()
    }

    /// Score pairs in `1..=max_score` matched by zero or several rules
    pub fn coverage_gaps(&self, max_score: u8) -> Vec<(u8, u8)> {
        let mut gaps = Vec::new();
        for r in 1..=max_score {
            for f in 1..=max_score {
                if self.match_count(r, f) != 1 {
                    gaps.push((r, f));
                }
            }
        }
        gaps
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedRecord {
    pub scored: ScoredRecord,
    pub segment: Segment,
}

/// Classify every scored record; any unmapped pair fails the whole batch
pub fn segment_records(
    scored: Vec<ScoredRecord>,
    classifier: &SegmentClassifier,
) -> RfmResult<Vec<SegmentedRecord>> {
    scored
        .into_iter()
        .map(|record| {
            let segment =
                classifier.classify(record.scores.recency, record.scores.frequency)?;
            Ok(SegmentedRecord {
                scored: record,
                segment,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfm::RfmRecord;
    use crate::score::RfmScores;

    fn scored(customer_id: i64, r: u8, f: u8, m: u8, monetary: f64) -> ScoredRecord {
        ScoredRecord {
            rfm: RfmRecord {
                customer_id,
                recency: 10,
                frequency: 2,
                monetary,
            },
            scores: RfmScores {
                recency: r,
                frequency: f,
                monetary: m,
            },
        }
    }

    #[test]
    fn test_default_rules_partition_grid() {
        let classifier = SegmentClassifier::default();
        assert!(classifier.coverage_gaps(5).is_empty());
        for r in 1..=5 {
            for f in 1..=5 {
                assert_eq!(classifier.match_count(r, f), 1, "cell R={} F={}", r, f);
            }
        }
    }

    #[test]
    fn test_rule_table_cells() {
        let classifier = SegmentClassifier::default();
        let expected = [
            ((1, 1), Segment::Hibernating),
            ((2, 2), Segment::Hibernating),
            ((2, 3), Segment::AtRisk),
            ((1, 4), Segment::AtRisk),
            ((2, 5), Segment::CantLoseThem),
            ((3, 2), Segment::AboutToSleep),
            ((3, 3), Segment::NeedAttention),
            ((3, 4), Segment::LoyalCustomers),
            ((4, 5), Segment::LoyalCustomers),
            ((4, 1), Segment::Promising),
            ((5, 1), Segment::NewCustomers),
            ((4, 2), Segment::PotentialLoyalists),
            ((5, 3), Segment::PotentialLoyalists),
            ((5, 4), Segment::Champions),
            ((5, 5), Segment::Champions),
        ];
        for ((r, f), segment) in expected {
            assert_eq!(classifier.classify(r, f).unwrap(), segment);
        }
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        let classifier = SegmentClassifier::new(vec![
            SegmentRule::new(ScoreSet::only(5), ScoreSet::only(5), Segment::Champions),
            SegmentRule::new(ScoreSet::range(1, 5), ScoreSet::range(1, 5), Segment::Hibernating),
        ]);
        assert_eq!(classifier.classify(5, 5).unwrap(), Segment::Champions);
        assert_eq!(classifier.classify(4, 5).unwrap(), Segment::Hibernating);
        assert_eq!(classifier.match_count(5, 5), 2);
        assert_eq!(classifier.coverage_gaps(5), vec![(5, 5)]);
    }

    #[test]
    fn test_unmapped_score_is_error() {
        let classifier = SegmentClassifier::new(DEFAULT_RULES[..9].to_vec());
        assert_eq!(
            classifier.classify(5, 5),
            Err(RfmError::UnmappedScore {
                recency: 5,
                frequency: 5
            })
        );
        assert_eq!(
            SegmentClassifier::default().classify(0, 3),
            Err(RfmError::UnmappedScore {
                recency: 0,
                frequency: 3
            })
        );
    }

    #[test]
    fn test_segment_ignores_monetary_score() {
        let classifier = SegmentClassifier::default();
        let records: Vec<ScoredRecord> = (1..=5)
            .map(|m| scored(m as i64, 3, 3, m, m as f64 * 1000.0))
            .collect();
        let segmented = segment_records(records, &classifier).unwrap();
        assert!(segmented
            .iter()
            .all(|s| s.segment == Segment::NeedAttention));
    }

    #[test]
    fn test_segment_records_fails_whole_batch() {
        let classifier = SegmentClassifier::new(DEFAULT_RULES[1..].to_vec());
        let records = vec![scored(1, 5, 5, 5, 10.0), scored(2, 1, 1, 1, 1.0)];
        assert!(matches!(
            segment_records(records, &classifier),
            Err(RfmError::UnmappedScore { .. })
        ));
    }

    #[test]
    fn test_labels_are_unique() {
        let mut labels: Vec<&str> = Segment::ALL.iter().map(|s| s.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Segment::ALL.len());
        assert_eq!(Segment::CantLoseThem.to_string(), "Can't Lose Them");
    }
}
