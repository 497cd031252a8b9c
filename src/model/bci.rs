//! Bill calculation settings.

use serde::{Deserialize, Serialize};

/// The allocation rule of one cost category. The German strings are the tags
/// used in the `Abrechnungseinstellungen` sheet; they are matched here, once,
/// at the parse boundary, and the rest of the program only sees this enum.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    /// Equal split across all apartments.
    PerApartment,
    /// Split by the occupant count effective during the billed range.
    PerPerson,
    /// Split by floor-area share.
    PerSquareMeter,
    /// Billed by metered consumption.
    PerConsumption,
    Half,
    Third,
    Quarter,
    /// The full invoice amount, no split.
    Complete,
}

serde_plain::derive_display_from_serialize!(SplitType);
serde_plain::derive_fromstr_from_deserialize!(SplitType);

pub(crate) const PER_APARTMENT_TAG: &str = "Pro Wohnung";
pub(crate) const PER_PERSON_TAG: &str = "Pro Person";
pub(crate) const PER_SQUARE_METER_TAG: &str = "Pro Quadratmeter";
pub(crate) const PER_CONSUMPTION_TAG: &str = "Nach Verbrauch";
pub(crate) const HALF_TAG: &str = "Hälfte";
pub(crate) const THIRD_TAG: &str = "Drittel";
pub(crate) const QUARTER_TAG: &str = "Viertel";
pub(crate) const COMPLETE_TAG: &str = "Komplett";

impl SplitType {
    /// Parses the workbook tag. An unknown tag is a hard error; the caller
    /// aborts bill generation.
    pub fn from_tag(tag: impl AsRef<str>) -> Option<SplitType> {
        match tag.as_ref() {
            PER_APARTMENT_TAG => Some(SplitType::PerApartment),
            PER_PERSON_TAG => Some(SplitType::PerPerson),
            PER_SQUARE_METER_TAG => Some(SplitType::PerSquareMeter),
            PER_CONSUMPTION_TAG => Some(SplitType::PerConsumption),
            HALF_TAG => Some(SplitType::Half),
            THIRD_TAG => Some(SplitType::Third),
            QUARTER_TAG => Some(SplitType::Quarter),
            COMPLETE_TAG => Some(SplitType::Complete),
            _ => None,
        }
    }

    /// The workbook tag, as written into the result document's rule column.
    pub fn tag(&self) -> &'static str {
        match self {
            SplitType::PerApartment => PER_APARTMENT_TAG,
            SplitType::PerPerson => PER_PERSON_TAG,
            SplitType::PerSquareMeter => PER_SQUARE_METER_TAG,
            SplitType::PerConsumption => PER_CONSUMPTION_TAG,
            SplitType::Half => HALF_TAG,
            SplitType::Third => THIRD_TAG,
            SplitType::Quarter => QUARTER_TAG,
            SplitType::Complete => COMPLETE_TAG,
        }
    }
}

/// One row of billing configuration: how one cost category is allocated for
/// one apartment.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BillCalculationItem {
    pub apartment: String,
    pub split: SplitType,
    /// Billing unit; required for `PerConsumption`, empty otherwise.
    pub unit: String,
    /// The cost category this rule applies to, matched against invoice types.
    pub invoice_type: String,
    /// Name of the meter to read; empty unless the rule is consumption-based.
    pub meter: String,
}
