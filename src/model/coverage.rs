//! Tracks which parts of the bill period have not been billed yet.

use crate::model::DateRange;
use serde::{Deserialize, Serialize};

/// The set of disjoint sub-ranges of one reference range that no line item
/// has covered yet. One instance exists per cost category; the allocation
/// engine calls `cover` for every line item it produces and reads `ranges`
/// at the end of the run to report gaps.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DateCoverage {
    ranges: Vec<DateRange>,
}

impl DateCoverage {
    /// Starts with the whole reference range uncovered.
    pub fn new(reference: DateRange) -> Self {
        Self {
            ranges: vec![reference],
        }
    }

    /// The sub-ranges still uncovered.
    pub fn ranges(&self) -> &[DateRange] {
        &self.ranges
    }

    /// Removes `covered` from every tracked range. A tracked range can
    /// survive untouched, shrink from either side, split in two, or
    /// disappear entirely. Afterwards no tracked range overlaps `covered`.
    pub fn cover(&mut self, covered: &DateRange) {
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for range in &self.ranges {
            let begin_inside = covered.contains(range.begin);
            let end_inside = covered.contains(range.end);
            if begin_inside && end_inside {
                // Fully billed.
            } else if begin_inside {
                kept.push(DateRange::new(covered.end.tomorrow(), range.end));
            } else if end_inside {
                kept.push(DateRange::new(range.begin, covered.begin.yesterday()));
            } else if range.contains_range(covered) {
                kept.push(DateRange::new(range.begin, covered.begin.yesterday()));
                kept.push(DateRange::new(covered.end.tomorrow(), range.end));
            } else {
                kept.push(*range);
            }
        }
        self.ranges = kept;
    }
}
