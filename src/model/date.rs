//! Day-granularity calendar types.
//!
//! `Date` wraps `chrono::NaiveDate` and pins the external string form to
//! `DD.MM.YYYY`, which is the only date format the input workbook uses.
//! `DateRange` is inclusive on both ends.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The workbook's date format.
const DATE_FORMAT: &str = "%d.%m.%Y";

/// A calendar day.
///
/// # Examples
///
/// ```
/// # use nebenkosten::model::Date;
/// # use std::str::FromStr;
/// let date = Date::from_str("01.02.2020").unwrap();
/// assert_eq!(date.to_string(), "01.02.2020");
/// assert_eq!(date.tomorrow().to_string(), "02.02.2020");
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Date(NaiveDate);

impl Date {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn inner(&self) -> NaiveDate {
        self.0
    }

    /// The day before.
    pub fn yesterday(&self) -> Date {
        Date(self.0.pred_opt().expect("date underflow"))
    }

    /// The day after.
    pub fn tomorrow(&self) -> Date {
        Date(self.0.succ_opt().expect("date overflow"))
    }

    /// Signed number of calendar days from `other` to `self`. This is the
    /// plain delta, not an inclusive day count.
    pub fn days_since(&self, other: Date) -> i64 {
        self.0.signed_duration_since(other.0).num_days()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }
}

impl FromStr for Date {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map_err(|e| anyhow::anyhow!("'{s}' is not a DD.MM.YYYY date: {e}"))?;
        Ok(Date(parsed))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl Serialize for Date {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Date::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// An inclusive date interval.
///
/// `begin <= end` is a caller-enforced invariant; operations assume a
/// non-empty range and make no attempt to validate a reversed one.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DateRange {
    pub begin: Date,
    pub end: Date,
}

impl DateRange {
    pub fn new(begin: Date, end: Date) -> Self {
        Self { begin, end }
    }

    /// True if `date` lies within the range, endpoints included.
    pub fn contains(&self, date: Date) -> bool {
        self.begin <= date && date <= self.end
    }

    /// True if the ranges share at least one day.
    ///
    /// Either endpoint of one range inside the other counts, and so does one
    /// range strictly containing the other. Invoice ranges can fully straddle
    /// the bill range or vice versa, so a plain endpoint comparison is not
    /// enough.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        if other.contains(self.begin) || other.contains(self.end) {
            return true;
        }
        self.begin < other.begin && self.end > other.end
    }

    /// True if `other` lies entirely within this range.
    pub fn contains_range(&self, other: &DateRange) -> bool {
        self.contains(other.begin) && self.contains(other.end)
    }

    /// Inclusive day count ("Tage" in the result document): both endpoints
    /// count, so a one-day range has 1 day.
    pub fn days(&self) -> i64 {
        self.end.days_since(self.begin) + 1
    }

    /// The intersection of this range with `other`, as used when clipping an
    /// invoice range to the bill range. Callers must ensure the ranges
    /// overlap, otherwise the result is reversed.
    pub fn clip(&self, other: &DateRange) -> DateRange {
        DateRange::new(self.begin.max(other.begin), self.end.min(other.end))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.begin, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Date {
        Date::from_str(s).unwrap()
    }

    fn r(begin: &str, end: &str) -> DateRange {
        DateRange::new(d(begin), d(end))
    }

    #[test]
    fn test_parse_and_display_round_trip() {
        for s in ["01.01.2020", "29.02.2020", "31.12.1999", "05.10.2021"] {
            assert_eq!(Date::from_str(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Date::from_str("2020-01-01").is_err());
        assert!(Date::from_str("32.01.2020").is_err());
        assert!(Date::from_str("30.02.2021").is_err());
        assert!(Date::from_str("").is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(d("01.01.2020") > d("31.12.2019"));
        assert!(d("01.01.2020") < d("31.12.2020"));
        assert_eq!(d("01.01.2020"), d("01.01.2020"));
    }

    #[test]
    fn test_yesterday() {
        assert_eq!(d("02.01.2020").yesterday(), d("01.01.2020"));
        assert_eq!(d("01.01.2020").yesterday(), d("31.12.2019"));
        assert_eq!(d("01.03.2020").yesterday(), d("29.02.2020"));
    }

    #[test]
    fn test_tomorrow() {
        assert_eq!(d("02.01.2020").tomorrow(), d("03.01.2020"));
        assert_eq!(d("31.12.2020").tomorrow(), d("01.01.2021"));
    }

    #[test]
    fn test_tomorrow_yesterday_inverse() {
        for s in ["01.01.2020", "28.02.2019", "31.12.2020"] {
            assert_eq!(d(s).tomorrow().yesterday(), d(s));
        }
    }

    #[test]
    fn test_days_since_is_a_plain_delta() {
        assert_eq!(d("01.02.2020").days_since(d("01.01.2020")), 31);
        assert_eq!(d("15.01.2020").days_since(d("01.01.2020")), 14);
        assert_eq!(d("01.01.2020").days_since(d("01.01.2020")), 0);
        assert_eq!(d("01.01.2020").days_since(d("02.01.2020")), -1);
    }

    #[test]
    fn test_range_contains() {
        let range = r("01.01.2020", "31.01.2021");
        assert!(range.contains(d("01.01.2020")));
        assert!(!range.contains(d("31.12.2019")));
        assert!(range.contains(d("15.06.2020")));
        assert!(range.contains(d("31.01.2021")));
        assert!(!range.contains(d("01.02.2021")));
    }

    #[test]
    fn test_range_days_is_inclusive() {
        assert_eq!(r("01.01.2020", "01.01.2020").days(), 1);
        assert_eq!(r("01.01.2020", "31.01.2020").days(), 31);
        assert_eq!(r("01.01.2020", "31.12.2020").days(), 366);
    }

    #[test]
    fn test_overlaps_partial() {
        let a = r("01.01.2020", "15.01.2020");
        let b = r("17.01.2019", "18.01.2020");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_overlaps_strict_containment_both_directions() {
        let outer = r("01.01.2020", "31.12.2020");
        let inner = r("01.06.2020", "30.06.2020");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn test_overlaps_disjoint_is_symmetric_false() {
        let a = r("01.01.2020", "31.01.2020");
        let b = r("01.02.2020", "29.02.2020");
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_overlaps_single_shared_day() {
        let a = r("01.01.2020", "15.01.2020");
        let b = r("15.01.2020", "31.01.2020");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_contains_range() {
        let range = r("01.01.2020", "15.01.2020");
        assert!(range.contains_range(&r("01.01.2020", "15.01.2020")));
        assert!(!range.contains_range(&r("31.12.2019", "15.01.2020")));
        assert!(!range.contains_range(&r("31.12.2019", "16.01.2020")));
        assert!(!range.contains_range(&r("05.01.2020", "16.01.2020")));
        assert!(range.contains_range(&r("05.01.2020", "10.01.2020")));
    }

    #[test]
    fn test_clip() {
        let bill = r("01.01.2020", "31.12.2020");
        let invoice = r("01.11.2019", "31.03.2020");
        assert_eq!(invoice.clip(&bill), r("01.01.2020", "31.03.2020"));
        let inside = r("01.05.2020", "30.06.2020");
        assert_eq!(inside.clip(&bill), inside);
    }

    #[test]
    fn test_serde_round_trip() {
        let date = d("24.12.2020");
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"24.12.2020\"");
        let back: Date = serde_json::from_str(&json).unwrap();
        assert_eq!(back, date);
    }
}
