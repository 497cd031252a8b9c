//! Invoices and the occupancy-change splitter.

use crate::model::{Amount, Date, DateRange};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

/// One invoice from the `Rechnungen` sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Invoice {
    /// Cost category, matched against `BillCalculationItem::invoice_type`.
    pub invoice_type: String,
    pub supplier: String,
    pub invoice_number: String,
    /// Issue date of the invoice document.
    pub date: Date,
    pub notes: String,
    /// The period of service the invoice covers.
    pub range: DateRange,
    /// Net amount per billing unit.
    pub net: Amount,
    /// Quantity of billing units.
    pub amount: Decimal,
    /// Tax rate, e.g. `0.19`.
    pub tax: Decimal,
    /// File name of the scanned receipt, empty if none exists.
    pub path: String,
}

impl Invoice {
    /// Splits this invoice at the dates where the total occupant count of
    /// the apartment changed, so that each part can be billed at the count
    /// that was effective during it.
    ///
    /// `change_points` is the ordered output of
    /// [`people_count_changes`](crate::occupancy::people_count_changes),
    /// covering the apartment's tenancy horizon (not necessarily this
    /// invoice's own range). The returned parts are independent owned copies
    /// whose ranges are contiguous and reconstruct `self.range` exactly.
    ///
    /// An empty `change_points` list means the apartment has no tenancy
    /// records at all. The invoice is dropped from billing in that case (no
    /// parts are returned) and an error event is emitted; the coverage
    /// report will show the resulting gap.
    pub fn split(&self, change_points: &[(Date, u32)]) -> Vec<(Invoice, u32)> {
        if change_points.is_empty() {
            error!(
                invoice_number = %self.invoice_number,
                "no occupancy change points; invoice will not be billed"
            );
            return Vec::new();
        }

        let mut parts: Vec<(Invoice, u32)> = Vec::new();
        // Seeded from the first change point: a change list that starts
        // after the invoice's begin still tags the leading part with the
        // count that was in effect there.
        let mut people_count_before: u32 = change_points[0].1;
        let mut invoice_begin = self.range.begin;
        let mut end_of_invoice = false;

        for &(split_date, people_count) in change_points {
            if split_date == self.range.begin {
                people_count_before = people_count;
                continue;
            }

            if split_date >= self.range.begin {
                let mut part = self.clone();
                part.range.begin = self.range.begin.max(invoice_begin);
                part.range.end = self.range.end.min(split_date.yesterday());
                parts.push((part, people_count_before));

                invoice_begin = split_date;
            }

            people_count_before = people_count;

            if split_date > self.range.end {
                end_of_invoice = true;
                break;
            }
        }

        if !end_of_invoice {
            let mut part = self.clone();
            part.range.begin = invoice_begin;
            parts.push((part, people_count_before));
        }

        parts
    }
}
