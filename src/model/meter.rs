//! Meters and meter readings.

use crate::model::Date;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A utility meter from the `Zähler` sheet.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Meter {
    pub name: String,
    /// The physical meter number printed on the device.
    pub number: String,
    /// Physical unit of the count, e.g. `m³` or `kWh`.
    pub unit: String,
}

/// How a meter-value row came to be.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Read off the physical meter; present in the input workbook.
    Measured,
    /// Estimated by hand in the input workbook.
    Estimated,
    /// Interpolated by this program between two bracketing readings.
    Computed,
}

serde_plain::derive_display_from_serialize!(ValueKind);
serde_plain::derive_fromstr_from_deserialize!(ValueKind);

impl ValueKind {
    /// The marker written into the result document. These are the German
    /// words the original workbooks use.
    pub fn marker(&self) -> &'static str {
        match self {
            ValueKind::Measured => "Gemessen",
            ValueKind::Estimated => "Geschätzt",
            ValueKind::Computed => "Berechnet",
        }
    }
}

/// A dated reading of one meter's cumulative count.
///
/// A reading loaded from the workbook has `Some(count)`. A placeholder
/// inserted for a date that needs interpolation starts with `count: None`
/// and is resolved once its bracketing rows are known.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MeterValue {
    pub name: String,
    pub count: Option<Decimal>,
    pub date: Date,
    pub kind: ValueKind,
}

impl MeterValue {
    pub fn measured(name: impl Into<String>, count: Decimal, date: Date) -> Self {
        Self {
            name: name.into(),
            count: Some(count),
            date,
            kind: ValueKind::Measured,
        }
    }

    /// An unresolved placeholder for a date that will be interpolated.
    pub fn placeholder(name: impl Into<String>, date: Date) -> Self {
        Self {
            name: name.into(),
            count: None,
            date,
            kind: ValueKind::Computed,
        }
    }
}
