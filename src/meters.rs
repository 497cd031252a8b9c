//! Meter reading lookup and interpolation.

use crate::error::{BillError, LookupSide};
use crate::model::{Date, MeterValue};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// The result of estimating a reading at a date with no measurement: the
/// bracketing measured dates and the day-weighted value between them.
///
/// The bracket dates are kept so the output layer can render the
/// interpolation expression once it knows which rows the bracket readings
/// landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpolation {
    pub before: Date,
    pub after: Date,
    pub value: Decimal,
}

/// Holds all readings of one named meter and answers reading queries at
/// arbitrary dates, estimating between bracketing measurements where no
/// reading exists.
#[derive(Debug, Clone)]
pub struct MeterManager {
    meter_name: String,
    /// Readings keyed by date. The map's ordering doubles as the sorted
    /// date list needed for bracket lookup.
    values: BTreeMap<Date, MeterValue>,
}

impl MeterManager {
    /// Filters `meter_values` down to the readings of `meter_name`.
    pub fn new(meter_values: &[MeterValue], meter_name: impl Into<String>) -> Self {
        let meter_name = meter_name.into();
        let values: BTreeMap<Date, MeterValue> = meter_values
            .iter()
            .filter(|mv| mv.name == meter_name)
            .map(|mv| (mv.date, mv.clone()))
            .collect();
        debug!(meter = %meter_name, readings = values.len(), "meter manager created");
        Self { meter_name, values }
    }

    pub fn meter_name(&self) -> &str {
        &self.meter_name
    }

    /// True if a reading (measured or placeholder) exists at `date`.
    pub fn has_value(&self, date: Date) -> bool {
        self.values.contains_key(&date)
    }

    pub fn get(&self, date: Date) -> Option<&MeterValue> {
        self.values.get(&date)
    }

    /// The nearest measured date strictly before `date` and the first
    /// measured date at or after it.
    ///
    /// Only called for dates that have no reading of their own, so the
    /// "after" date is in practice strictly later. Fails when `date` lies
    /// before the first or after the last known reading; that is missing
    /// meter data the user has to add, not something to default.
    pub fn get_surrounding_dates(&self, date: Date) -> Result<(Date, Date), BillError> {
        let before = self
            .values
            .range(..date)
            .next_back()
            .map(|(d, _)| *d)
            .ok_or_else(|| BillError::MeterLookup {
                meter: self.meter_name.clone(),
                side: LookupSide::Before,
                date,
            })?;
        let after = self
            .values
            .range(date..)
            .next()
            .map(|(d, _)| *d)
            .ok_or_else(|| BillError::MeterLookup {
                meter: self.meter_name.clone(),
                side: LookupSide::After,
                date,
            })?;
        Ok((before, after))
    }

    /// Inserts an unresolved placeholder at `date` so the output layer
    /// writes a row for it. Idempotent: an existing reading is kept.
    pub fn add_meter_value(&mut self, date: Date) {
        self.values
            .entry(date)
            .or_insert_with(|| MeterValue::placeholder(self.meter_name.clone(), date));
    }

    /// Estimates the reading at `date` by day-weighted linear interpolation
    /// between the bracketing measured readings:
    ///
    /// `value(before) + (value(after) − value(before)) / days(after, before) × days(date, before)`
    ///
    /// Day counts here are plain calendar deltas (`a − b`), unlike the
    /// inclusive "Tage" counts used for invoice billing.
    pub fn interpolate(&self, date: Date) -> Result<Interpolation, BillError> {
        let (before, after) = self.get_surrounding_dates(date)?;
        let value_before = self.resolved_count(before)?;
        let value_after = self.resolved_count(after)?;

        let delta_days_total = Decimal::from(after.days_since(before));
        let delta_days_new = Decimal::from(date.days_since(before));
        let value = value_before + (value_after - value_before) / delta_days_total * delta_days_new;

        Ok(Interpolation {
            before,
            after,
            value,
        })
    }

    /// The count at a bracket date. A bracket date always carries a
    /// measured count; hitting a placeholder here means the caller asked
    /// for a bracket around an unresolved date, which the lookup above
    /// already excludes.
    fn resolved_count(&self, date: Date) -> Result<Decimal, BillError> {
        self.values
            .get(&date)
            .and_then(|mv| mv.count)
            .ok_or_else(|| BillError::MeterLookup {
                meter: self.meter_name.clone(),
                side: LookupSide::Before,
                date,
            })
    }

    /// All dates with a reading or placeholder, in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.values.keys().copied()
    }
}
