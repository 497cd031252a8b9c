//! The allocation engine: turns invoices, occupancy and meter readings into
//! the rows of the result document.

use crate::error::{BillError, Result};
use crate::meters::{Interpolation, MeterManager};
use crate::model::{
    BillCalculationItem, Date, DateCoverage, DateRange, Invoice, SplitType, ValueKind,
};
use crate::occupancy::people_count_changes;
use crate::sheet::input::BillInput;
use crate::sheet::output::{consumption_formula, count_formula, ResultDoc, ResultSheet, RowWriter};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Cold and warm water temperatures for the fixed m³ → kWh conversion.
const WATER_TEMPERATURE_COLD: i64 = 10;
const WATER_TEMPERATURE_WARM: i64 = 43;

/// The annotation on every sub-invoice after the first when an invoice was
/// split because the occupant count changed mid-period.
const OCCUPANCY_CHANGED_NOTE: &str = "Gesamtbewohnerzahl geändert";

/// How a line item's share of the invoice is expressed.
#[derive(Debug, Clone, PartialEq)]
enum Share {
    /// A metered quantity in the BCI's billing unit, plus the cross-sheet
    /// expression that derives it from the meter-value rows. The expression
    /// is opaque output text; `quantity` is what prices the item.
    Consumption {
        quantity: Decimal,
        expression: String,
    },
    /// A plain fraction of the invoice, e.g. 3/5 of it for a 3-person
    /// household in a 5-person building.
    Fraction { value: Decimal, expression: String },
}

/// One row of the details sheet, held until written.
#[derive(Debug, Clone)]
struct BillItem {
    invoice: Invoice,
    bci: BillCalculationItem,
    billed_range: DateRange,
    share: Share,
    comment: Option<String>,
}

impl BillItem {
    /// The gross total of the whole invoice: net × quantity × (1 + tax).
    fn gross(&self) -> Decimal {
        self.invoice.net.value() * self.invoice.amount * (Decimal::ONE + self.invoice.tax)
    }

    /// The monetary amount billed to the tenant for this line item.
    fn amount(&self) -> Decimal {
        match &self.share {
            // The net is a unit price here, so the share quantity prices
            // the consumption directly; no day proration.
            Share::Consumption { quantity, .. } => {
                self.invoice.net.value() * (Decimal::ONE + self.invoice.tax) * quantity
            }
            Share::Fraction { value, .. } => {
                let billed_days = Decimal::from(self.billed_range.days());
                let invoice_days = Decimal::from(self.invoice.range.days());
                self.gross() / invoice_days * billed_days * value
            }
        }
    }

    /// Writes this item as one details row.
    fn write(&self, mut row: RowWriter<'_>) {
        row.write_date(self.billed_range.begin);
        row.write_date(self.billed_range.end);
        row.write_number(Decimal::from(self.billed_range.days()), 0, None);
        row.write(&self.invoice.invoice_type);
        match &self.comment {
            Some(comment) => row.write(comment),
            None => row.write(&self.invoice.notes),
        }
        row.write(&self.bci.meter);
        row.write_currency(self.invoice.net.value());
        row.write_number(self.invoice.amount, 2, None);
        row.write_number(self.invoice.tax, 2, None);
        row.write_currency(self.gross());
        row.write_number(
            Decimal::from(self.invoice.range.days()),
            0,
            Some("Tage"),
        );
        row.write(self.bci.split.tag());
        match &self.share {
            Share::Consumption { expression, .. } => row.write(expression),
            Share::Fraction { expression, .. } => row.write(expression),
        }
        row.write_currency(self.amount());
        row.write(&self.invoice.path);
    }
}

/// A coverage gap: a sub-range of the bill period with no line item for a
/// cost category. Reported, never fatal.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CoverageGap {
    pub invoice_type: String,
    pub range: DateRange,
}

/// The finished bill: the result document, the receipts it references, and
/// the coverage gaps found after allocation.
#[derive(Debug)]
pub struct Bill {
    pub doc: ResultDoc,
    pub receipts: BTreeSet<String>,
    pub gaps: Vec<CoverageGap>,
}

/// Builds a bill for one apartment and period.
pub struct BillCreator<'a> {
    input: &'a BillInput,
    range: DateRange,
    doc: ResultDoc,
    /// Dates at which the building's total occupant count changes.
    split_dates: Vec<(Date, u32)>,
    /// One coverage tracker per cost category.
    coverages: BTreeMap<String, DateCoverage>,
    /// Receipt file names of every billed invoice.
    receipts: BTreeSet<String>,
    /// Amount billed per cost category, for the overview.
    totals: BTreeMap<String, Decimal>,
}

impl<'a> BillCreator<'a> {
    pub fn new(input: &'a BillInput, bill_range: DateRange) -> Self {
        let split_dates = people_count_changes(&bill_range, &input.tenants);
        let coverages = input
            .bcis
            .iter()
            .map(|bci| (bci.invoice_type.clone(), DateCoverage::new(bill_range)))
            .collect();
        Self {
            input,
            range: bill_range,
            doc: ResultDoc::new(),
            split_dates,
            coverages,
            receipts: BTreeSet::new(),
            totals: BTreeMap::new(),
        }
    }

    /// Runs the allocation: one pass over the BCIs in input order, then the
    /// coverage report, then the overview.
    pub fn create(mut self) -> Result<Bill> {
        for bci in &self.input.bcis {
            debug!(?bci, "processing");
            match bci.split {
                SplitType::PerConsumption => self.per_consumption(bci)?,
                SplitType::PerPerson => self.per_person(bci)?,
                _ => self.per_percentage(bci)?,
            }
        }

        let mut gaps = Vec::new();
        for (invoice_type, coverage) in &self.coverages {
            for uncovered in coverage.ranges() {
                warn!(
                    "Nothing was billed for '{}' between {} and {}.",
                    invoice_type, uncovered.begin, uncovered.end
                );
                gaps.push(CoverageGap {
                    invoice_type: invoice_type.clone(),
                    range: *uncovered,
                });
            }
        }

        self.write_overview();

        Ok(Bill {
            doc: self.doc,
            receipts: self.receipts,
            gaps,
        })
    }

    /// Invoices of this BCI's cost category overlapping the bill range, in
    /// input order.
    fn invoices(&self, bci: &BillCalculationItem) -> Vec<&'a Invoice> {
        self.input
            .invoices
            .iter()
            .filter(|i| i.invoice_type == bci.invoice_type && i.range.overlaps(&self.range))
            .collect()
    }

    /// Allocation by metered consumption.
    fn per_consumption(&mut self, bci: &BillCalculationItem) -> Result<()> {
        let meter = self.input.get_meter(&bci.meter).ok_or_else(|| {
            BillError::InputFile(format!("meter '{}' not in input file", bci.meter))
        })?;
        let mut manager = MeterManager::new(&self.input.meter_values, &bci.meter);

        // 1. Collect every date the meter sheet needs: the clipped range
        //    boundaries of each invoice, plus the bracket dates of any
        //    boundary that has no reading of its own.
        let mut dates: BTreeSet<Date> = BTreeSet::new();
        for invoice in self.invoices(bci) {
            let consumption_range = invoice.range.clip(&self.range);
            debug!(%consumption_range, "consumption range");
            for boundary in [consumption_range.begin, consumption_range.end] {
                dates.insert(boundary);
                if !manager.has_value(boundary) {
                    let (before, after) = manager.get_surrounding_dates(boundary)?;
                    dates.insert(before);
                    dates.insert(after);
                }
            }
        }

        // 2. Interpolate the missing dates against the measured readings
        //    before placeholders join the bracket search space.
        let mut interpolations: BTreeMap<Date, Interpolation> = BTreeMap::new();
        for &date in &dates {
            if !manager.has_value(date) {
                interpolations.insert(date, manager.interpolate(date)?);
            }
        }
        for &date in &dates {
            manager.add_meter_value(date);
        }

        // 3. Write one meter row per date; measured rows complete, computed
        //    rows as stubs to be filled once every row number is known.
        let mut rows: BTreeMap<Date, u32> = BTreeMap::new();
        for &date in &dates {
            let mut row = self.doc.row_writer(ResultSheet::MeterValues);
            row.write(&bci.meter);
            row.write_date(date);
            if let Some(count) = manager.get(date).and_then(|mv| mv.count) {
                row.write_number(count, 2, Some(&meter.unit));
                if let Some(mv) = manager.get(date) {
                    row.write(mv.kind.marker());
                }
            }
            rows.insert(date, row.row());
        }

        // 4. Resolve the computed rows.
        for (&date, interpolation) in &interpolations {
            let row = rows[&date];
            self.doc
                .cell_writer(ResultSheet::MeterValues, row, 3)
                .write_number(interpolation.value, 2, Some(&meter.unit));
            self.doc
                .cell_writer(ResultSheet::MeterValues, row, 4)
                .write(ValueKind::Computed.marker());
            self.doc
                .cell_writer(ResultSheet::MeterValues, row, 5)
                .write(count_formula(
                    rows[&interpolation.before],
                    rows[&interpolation.after],
                    row,
                ));
        }

        // 5. One bill item per invoice, billing the consumption between the
        //    clipped range's boundary readings.
        for invoice in self.invoices(bci) {
            let consumption_range = invoice.range.clip(&self.range);
            let begin_count = self.reading(&manager, &interpolations, consumption_range.begin)?;
            let end_count = self.reading(&manager, &interpolations, consumption_range.end)?;
            let consumption = end_count - begin_count;

            let mut expression =
                consumption_formula(rows[&consumption_range.begin], rows[&consumption_range.end]);
            let mut comment = None;
            let quantity = if bci.unit != meter.unit {
                let converted = convert_units(&meter.unit, &bci.unit, consumption)?;
                expression = format!(
                    "=({})*({WATER_TEMPERATURE_WARM}-{WATER_TEMPERATURE_COLD})*2.5",
                    expression.trim_start_matches('=')
                );
                comment = Some(format!("{} in {} umgerechnet.", meter.unit, bci.unit));
                converted
            } else {
                consumption
            };

            let item = BillItem {
                invoice: invoice.clone(),
                bci: bci.clone(),
                billed_range: consumption_range,
                share: Share::Consumption {
                    quantity,
                    expression,
                },
                comment,
            };
            self.emit(item);
        }
        Ok(())
    }

    /// The meter count at `date`: a real reading where one exists, the
    /// interpolated value otherwise.
    fn reading(
        &self,
        manager: &MeterManager,
        interpolations: &BTreeMap<Date, Interpolation>,
        date: Date,
    ) -> Result<Decimal> {
        if let Some(count) = manager.get(date).and_then(|mv| mv.count) {
            return Ok(count);
        }
        interpolations
            .get(&date)
            .map(|i| i.value)
            .ok_or_else(|| {
                BillError::InputFile(format!(
                    "no reading or estimate for meter '{}' at {date}",
                    manager.meter_name()
                ))
                .into()
            })
    }

    /// Allocation by occupant count: the invoice is split at occupancy
    /// changes and each part billed at tenant-people / part-people.
    fn per_person(&mut self, bci: &BillCalculationItem) -> Result<()> {
        for invoice in self.invoices(bci) {
            let mut comment = None;
            for (part, people_count) in invoice.split(&self.split_dates) {
                debug!(people_count, range = %part.range, "invoice part");
                let billed_range = part.range.clip(&self.range);

                let tenant_people = Decimal::from(self.input.tenant.people);
                let value = if people_count == 0 {
                    warn!(
                        invoice_number = %invoice.invoice_number,
                        "occupant count is zero during {billed_range}; billing a zero share"
                    );
                    Decimal::ZERO
                } else {
                    tenant_people / Decimal::from(people_count)
                };
                let expression = format!("{}/{}", self.input.tenant.people, people_count);

                let item = BillItem {
                    invoice: invoice.clone(),
                    bci: bci.clone(),
                    billed_range,
                    share: Share::Fraction { value, expression },
                    comment: comment.clone(),
                };
                self.emit(item);

                // Only parts after the first carry the annotation.
                comment = Some(OCCUPANCY_CHANGED_NOTE.to_string());
            }
        }
        Ok(())
    }

    /// Allocation by a fixed rule: a constant or a ratio from static
    /// apartment data, independent of consumption and occupancy.
    fn per_percentage(&mut self, bci: &BillCalculationItem) -> Result<()> {
        for invoice in self.invoices(bci) {
            let (value, expression) = match bci.split {
                SplitType::PerApartment => {
                    let count = Decimal::from(self.input.apartments.len() as u64);
                    (Decimal::ONE / count, format!("1/{}", self.input.apartments.len()))
                }
                SplitType::PerSquareMeter => {
                    let total: Decimal = self.input.apartments.iter().map(|a| a.size).sum();
                    (
                        self.input.apartment.size / total,
                        format!("{}/{}", self.input.apartment.size, total),
                    )
                }
                SplitType::Half => (Decimal::ONE / Decimal::from(2), "1/2".to_string()),
                SplitType::Third => (Decimal::ONE / Decimal::from(3), "1/3".to_string()),
                SplitType::Quarter => (Decimal::ONE / Decimal::from(4), "1/4".to_string()),
                SplitType::Complete => (Decimal::ONE, "1".to_string()),
                SplitType::PerPerson | SplitType::PerConsumption => {
                    unreachable!("dispatched in create")
                }
            };

            let billed_range = invoice.range.clip(&self.range);
            let item = BillItem {
                invoice: invoice.clone(),
                bci: bci.clone(),
                billed_range,
                share: Share::Fraction { value, expression },
                comment: None,
            };
            self.emit(item);
        }
        Ok(())
    }

    /// Writes one line item and records its side effects: the receipt, the
    /// coverage update and the overview total.
    fn emit(&mut self, item: BillItem) {
        let amount = item.amount();
        item.write(self.doc.row_writer(ResultSheet::Details));

        if !item.invoice.path.is_empty() {
            self.receipts.insert(item.invoice.path.clone());
        }
        if let Some(coverage) = self.coverages.get_mut(&item.bci.invoice_type) {
            coverage.cover(&item.billed_range);
        }
        *self
            .totals
            .entry(item.bci.invoice_type.clone())
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Writes the overview sheet. Runs last so the per-category totals over
    /// the details sheet are complete.
    fn write_overview(&mut self) {
        let mut row = self.doc.row_writer(ResultSheet::Overview);
        row.write("Nebenkostenabrechnung");
        row.write(&self.input.apartment.name);
        row.write("");
        row.write(&self.input.tenant.name);

        let mut row = self.doc.row_writer(ResultSheet::Overview);
        row.write("Zeitraum");
        row.write("");
        row.write_date(self.range.begin);
        row.write_date(self.range.end);

        self.doc.row_writer(ResultSheet::Overview).write(""); // spacer

        // The bill range expressed in months, for the monthly column.
        let year_days = if is_leap_year(self.range.begin.year()) {
            Decimal::from(366)
        } else {
            Decimal::from(365)
        };
        let months = Decimal::from(self.range.days()) / year_days * Decimal::from(12);

        let mut sum = Decimal::ZERO;
        for (invoice_type, total) in &self.totals {
            let mut row = self.doc.row_writer(ResultSheet::Overview);
            row.write("");
            row.write(invoice_type);
            row.write_currency(*total / months);
            row.write_currency(*total);
            sum += *total;
        }

        self.doc.row_writer(ResultSheet::Overview).write(""); // spacer

        let mut row = self.doc.row_writer(ResultSheet::Overview);
        row.write("");
        row.write("Summe");
        row.write_currency(sum / months);
        row.write_currency(sum);

        // The advance payments actually made are not in the input workbook;
        // the monthly advance from the tenancy record is shown and the
        // total left for the landlord to fill in, like the original sheet.
        let mut row = self.doc.row_writer(ResultSheet::Overview);
        row.write("");
        row.write("Abschlagszahlungen");
        row.write_currency(self.input.tenant.advance.value());
        row.write("BITTE EINTRAGEN");

        let mut row = self.doc.row_writer(ResultSheet::Overview);
        row.write("");
        row.write("Ergebnis");
        row.write("");
        row.write("Abschlagszahlungen minus Summe");
    }
}

/// Converts a consumption quantity between physical units. The only known
/// conversion is hot water volume to heating energy:
///
/// `kWh = m³ × (warm − cold) × 2.5`
fn convert_units(unit_from: &str, unit_to: &str, quantity: Decimal) -> Result<Decimal> {
    if unit_from == "m³" && unit_to == "kWh" {
        let delta = Decimal::from(WATER_TEMPERATURE_WARM - WATER_TEMPERATURE_COLD);
        return Ok(quantity * delta * Decimal::new(25, 1));
    }
    Err(BillError::InputFile(format!("cannot convert '{unit_from}' to '{unit_to}'")).into())
}

fn is_leap_year(year: i32) -> bool {
    chrono::NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}
