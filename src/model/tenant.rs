//! Tenancy and apartment records.

use crate::model::{Amount, Date};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One tenancy record from the `Mieter` sheet. An apartment can have several
/// overlapping records (e.g. a household growing mid-year appears as a second
/// record), which is why occupant counts are summed per day.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Tenant {
    pub name: String,
    pub apartment: String,
    pub moving_in: Date,
    /// `None` means still resident.
    pub moving_out: Option<Date>,
    /// Number of people this record contributes to the occupant count.
    pub people: u32,
    /// Monthly rent, pass-through to the overview.
    pub rent: Amount,
    /// Monthly advance payment, pass-through to the overview.
    pub advance: Amount,
}

impl Tenant {
    /// True if the tenant was resident on `date`. An open-ended tenancy
    /// contains every date from moving in onward.
    pub fn contains(&self, date: Date) -> bool {
        if date < self.moving_in {
            return false;
        }
        match self.moving_out {
            Some(moving_out) => date <= moving_out,
            None => true,
        }
    }
}

/// One apartment from the `Wohnungen` sheet.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Apartment {
    pub name: String,
    /// Floor area in square meters, used for area-proportional splits.
    pub size: Decimal,
}
