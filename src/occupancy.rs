//! Derives the dates at which an apartment's total occupant count changes.

use crate::model::{Date, DateRange, Tenant};

/// Walks every day of `range` and emits `(date, count)` whenever the summed
/// occupant count over all tenancy records containing that day differs from
/// the day before. The first day is always emitted when any tenant record
/// exists (the count "before" the range is treated as -1).
///
/// The returned list is strictly increasing by date; each entry means "the
/// occupant count becomes this value effective this date".
///
/// This is O(days × tenants). The inputs are a few years of days and a
/// handful of tenancy records, so the simple walk is kept for correctness.
pub fn people_count_changes(range: &DateRange, tenants: &[Tenant]) -> Vec<(Date, u32)> {
    let mut changes = Vec::new();

    let mut date = range.begin;
    let mut count_before: i64 = -1;

    while date <= range.end {
        let count: u32 = tenants
            .iter()
            .filter(|t| t.contains(date))
            .map(|t| t.people)
            .sum();

        if i64::from(count) != count_before {
            changes.push((date, count));
        }

        count_before = i64::from(count);
        date = date.tomorrow();
    }

    changes
}
