//! Reads the input workbook.
//!
//! The workbook is the user-maintained `.xlsx` with six sheets (German
//! names, one entity per sheet). Loading resolves the target apartment and
//! tenant up front and pre-filters invoices to the bill range, so the
//! allocation engine never sees data outside its period.

use crate::error::{BillError, Result};
use crate::model::{
    Apartment, BillCalculationItem, Date, DateRange, Invoice, Meter, MeterValue, SplitType, Tenant,
    ValueKind,
};
use anyhow::Context;
use calamine::{open_workbook, Reader, Xlsx};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// The sheets of the input workbook.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSheet {
    Invoices,
    Apartments,
    Tenants,
    MeterValues,
    Meters,
    BillCalculationItems,
}

serde_plain::derive_display_from_serialize!(InputSheet);

impl InputSheet {
    pub fn sheet_name(&self) -> &'static str {
        match self {
            InputSheet::Invoices => "Rechnungen",
            InputSheet::Apartments => "Wohnungen",
            InputSheet::Tenants => "Mieter",
            InputSheet::MeterValues => "Zählerstände",
            InputSheet::Meters => "Zähler",
            InputSheet::BillCalculationItems => "Abrechnungseinstellungen",
        }
    }
}

/// Everything the allocation engine needs for one run, loaded eagerly.
#[derive(Debug, Clone)]
pub struct BillInput {
    /// Invoices overlapping the bill range, in workbook order.
    pub invoices: Vec<Invoice>,
    pub apartments: Vec<Apartment>,
    /// The apartment the bill is for.
    pub apartment: Apartment,
    /// All tenancy records of the building.
    pub tenants: Vec<Tenant>,
    /// The tenant occupying `apartment` for the whole bill range.
    pub tenant: Tenant,
    pub meter_values: Vec<MeterValue>,
    pub meters: Vec<Meter>,
    /// Billing configuration for `apartment` only.
    pub bcis: Vec<BillCalculationItem>,
}

impl BillInput {
    /// Loads the workbook at `path` and resolves the run's apartment and
    /// tenant. Fatal if the apartment is unknown or no tenant covers the
    /// whole bill range.
    pub fn load(path: &Path, apartment_name: &str, bill_range: &DateRange) -> Result<Self> {
        debug!("Loading {} ...", path.display());
        let mut workbook: Xlsx<_> = open_workbook(path)
            .with_context(|| format!("Unable to open workbook {}", path.display()))?;

        let invoices = data_rows(&mut workbook, InputSheet::Invoices)?
            .iter()
            .map(|row| parse_invoice(row))
            .collect::<Result<Vec<Invoice>>>()?;
        let apartments = data_rows(&mut workbook, InputSheet::Apartments)?
            .iter()
            .map(|row| parse_apartment(row))
            .collect::<Result<Vec<Apartment>>>()?;
        let tenants = data_rows(&mut workbook, InputSheet::Tenants)?
            .iter()
            .map(|row| parse_tenant(row))
            .collect::<Result<Vec<Tenant>>>()?;
        let meter_values = data_rows(&mut workbook, InputSheet::MeterValues)?
            .iter()
            .map(|row| parse_meter_value(row))
            .collect::<Result<Vec<MeterValue>>>()?;
        let meters = data_rows(&mut workbook, InputSheet::Meters)?
            .iter()
            .map(|row| parse_meter(row))
            .collect::<Result<Vec<Meter>>>()?;
        let bcis = data_rows(&mut workbook, InputSheet::BillCalculationItems)?
            .iter()
            .map(|row| parse_bci(row))
            .collect::<Result<Vec<BillCalculationItem>>>()?;

        Self::from_parts(
            invoices,
            apartments,
            tenants,
            meter_values,
            meters,
            bcis,
            apartment_name,
            bill_range,
        )
    }

    /// Builds the input from already-parsed entities, applying the same
    /// filtering and resolution as `load`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        invoices: Vec<Invoice>,
        apartments: Vec<Apartment>,
        tenants: Vec<Tenant>,
        meter_values: Vec<MeterValue>,
        meters: Vec<Meter>,
        bcis: Vec<BillCalculationItem>,
        apartment_name: &str,
        bill_range: &DateRange,
    ) -> Result<Self> {
        let invoices: Vec<Invoice> = invoices
            .into_iter()
            .filter(|i| i.range.overlaps(bill_range))
            .collect();
        debug!("{} invoices overlap the bill range", invoices.len());

        let apartment = apartments
            .iter()
            .find(|a| a.name == apartment_name)
            .cloned()
            .ok_or_else(|| {
                BillError::InputFile(format!("apartment '{apartment_name}' not in input file"))
            })?;

        let tenant = tenants
            .iter()
            .find(|t| t.apartment == apartment_name && t.contains(bill_range.begin))
            .cloned()
            .ok_or_else(|| {
                BillError::InputFile(format!(
                    "no tenant known for apartment '{apartment_name}' at {}",
                    bill_range.begin
                ))
            })?;
        if !tenant.contains(bill_range.end) {
            return Err(BillError::InputFile(format!(
                "tenant '{}' did not occupy the apartment for the whole bill range ({} - {})",
                tenant.name,
                tenant.moving_in,
                tenant
                    .moving_out
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "open".to_string()),
            ))
            .into());
        }
        info!("Tenant: {}", tenant.name);

        let bcis: Vec<BillCalculationItem> = bcis
            .into_iter()
            .filter(|bci| bci.apartment == apartment_name)
            .collect();
        for bci in &bcis {
            if bci.split == SplitType::PerConsumption && bci.unit.is_empty() {
                return Err(BillError::InputFile(format!(
                    "'{}' for apartment '{}' is billed by consumption but has no unit",
                    bci.invoice_type, bci.apartment
                ))
                .into());
            }
        }
        debug!("{} bill calculation items", bcis.len());

        Ok(Self {
            invoices,
            apartments,
            apartment,
            tenants,
            tenant,
            meter_values,
            meters,
            bcis,
        })
    }

    /// Looks up a meter by name.
    pub fn get_meter(&self, meter_name: &str) -> Option<&Meter> {
        self.meters.iter().find(|m| m.name == meter_name)
    }
}

/// All data rows of `sheet` as trimmed strings, skipping rows with an empty
/// first cell (the workbook pads sheets with blank rows).
fn data_rows(workbook: &mut Xlsx<std::io::BufReader<std::fs::File>>, sheet: InputSheet) -> Result<Vec<Vec<String>>> {
    let range = workbook
        .worksheet_range(sheet.sheet_name())
        .with_context(|| format!("Sheet '{}' is missing from the workbook", sheet.sheet_name()))?;
    let rows = range
        .rows()
        .skip(1) // header row
        .map(|row| {
            row.iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect::<Vec<String>>()
        })
        .filter(|row| row.first().map(|c| !c.is_empty()).unwrap_or(false))
        .collect();
    Ok(rows)
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.as_str()).unwrap_or("")
}

fn parse_date(row: &[String], idx: usize) -> Result<Date> {
    Date::from_str(cell(row, idx))
        .map_err(|e| BillError::InvalidCell(format!("{e} in row {row:?}")).into())
}

fn parse_decimal(row: &[String], idx: usize) -> Result<Decimal> {
    let s = cell(row, idx);
    if s.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(s)
        .map_err(|e| BillError::InvalidCell(format!("'{s}' is not a number ({e}) in row {row:?}")).into())
}

fn parse_invoice(row: &[String]) -> Result<Invoice> {
    Ok(Invoice {
        invoice_type: cell(row, 0).to_string(),
        supplier: cell(row, 1).to_string(),
        invoice_number: cell(row, 2).to_string(),
        date: parse_date(row, 3)?,
        notes: cell(row, 4).to_string(),
        range: DateRange::new(parse_date(row, 5)?, parse_date(row, 6)?),
        net: cell(row, 7)
            .parse()
            .map_err(|e| BillError::InvalidCell(format!("{e} in row {row:?}")))?,
        amount: parse_decimal(row, 8)?,
        tax: parse_decimal(row, 9)?,
        path: cell(row, 11).to_string(),
    })
}

fn parse_apartment(row: &[String]) -> Result<Apartment> {
    Ok(Apartment {
        name: cell(row, 0).to_string(),
        size: parse_decimal(row, 1)?,
    })
}

fn parse_tenant(row: &[String]) -> Result<Tenant> {
    let moving_out = if cell(row, 3).is_empty() {
        None
    } else {
        Some(parse_date(row, 3)?)
    };
    let people_cell = cell(row, 4);
    let people: u32 = people_cell.parse().map_err(|e| {
        BillError::InvalidCell(format!("'{people_cell}' is not a people count ({e}) in row {row:?}"))
    })?;
    Ok(Tenant {
        name: cell(row, 0).to_string(),
        apartment: cell(row, 1).to_string(),
        moving_in: parse_date(row, 2)?,
        moving_out,
        people,
        rent: cell(row, 5)
            .parse()
            .map_err(|e| BillError::InvalidCell(format!("{e} in row {row:?}")))?,
        advance: cell(row, 6)
            .parse()
            .map_err(|e| BillError::InvalidCell(format!("{e} in row {row:?}")))?,
    })
}

fn parse_meter_value(row: &[String]) -> Result<MeterValue> {
    let notes = cell(row, 3);
    let kind = if notes.contains("Geschätzt") {
        ValueKind::Estimated
    } else {
        ValueKind::Measured
    };
    Ok(MeterValue {
        name: cell(row, 0).to_string(),
        count: Some(parse_decimal(row, 1)?),
        date: parse_date(row, 2)?,
        kind,
    })
}

fn parse_meter(row: &[String]) -> Result<Meter> {
    Ok(Meter {
        name: cell(row, 0).to_string(),
        number: cell(row, 1).to_string(),
        unit: cell(row, 2).to_string(),
    })
}

fn parse_bci(row: &[String]) -> Result<BillCalculationItem> {
    let tag = cell(row, 1);
    let split = SplitType::from_tag(tag)
        .ok_or_else(|| BillError::InvalidCell(format!("unknown bill split '{tag}' in row {row:?}")))?;
    Ok(BillCalculationItem {
        apartment: cell(row, 0).to_string(),
        split,
        unit: cell(row, 2).to_string(),
        invoice_type: cell(row, 3).to_string(),
        meter: cell(row, 4).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Amount;

    fn d(s: &str) -> Date {
        Date::from_str(s).unwrap()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn sample_tenant(apartment: &str, moving_in: &str, moving_out: Option<&str>) -> Tenant {
        Tenant {
            name: format!("{apartment} tenant"),
            apartment: apartment.into(),
            moving_in: d(moving_in),
            moving_out: moving_out.map(d),
            people: 2,
            rent: Amount::default(),
            advance: Amount::default(),
        }
    }

    fn sample_apartment(name: &str) -> Apartment {
        Apartment {
            name: name.into(),
            size: Decimal::from(50),
        }
    }

    #[test]
    fn test_parse_invoice_row() {
        let invoice = parse_invoice(&row(&[
            "Strom",
            "Stadtwerke",
            "R-001",
            "15.01.2021",
            "Jahresrechnung",
            "01.01.2020",
            "31.12.2020",
            "0.30",
            "3500",
            "0.19",
            "",
            "r-001.pdf",
        ]))
        .unwrap();
        assert_eq!(invoice.invoice_type, "Strom");
        assert_eq!(invoice.range, DateRange::new(d("01.01.2020"), d("31.12.2020")));
        assert_eq!(invoice.amount, Decimal::from(3500));
        assert_eq!(invoice.path, "r-001.pdf");
    }

    #[test]
    fn test_parse_invoice_row_bad_date_names_row() {
        let err = parse_invoice(&row(&[
            "Strom", "Stadtwerke", "R-001", "bogus", "", "01.01.2020", "31.12.2020", "1", "1",
            "0.19", "", "",
        ]))
        .unwrap_err();
        let message = format!("{err}");
        assert!(message.contains("bogus"));
        assert!(message.contains("R-001"));
    }

    #[test]
    fn test_parse_tenant_row_open_ended() {
        let tenant = parse_tenant(&row(&[
            "Maria Meier",
            "Wohnung 1",
            "15.01.2019",
            "",
            "2",
            "650",
            "150",
        ]))
        .unwrap();
        assert_eq!(tenant.moving_out, None);
        assert_eq!(tenant.people, 2);
    }

    #[test]
    fn test_parse_tenant_row_bad_people_count() {
        let err = parse_tenant(&row(&[
            "Maria Meier",
            "Wohnung 1",
            "15.01.2019",
            "",
            "zwei",
            "650",
            "150",
        ]))
        .unwrap_err();
        assert!(format!("{err}").contains("zwei"));
    }

    #[test]
    fn test_parse_meter_value_row_kinds() {
        let measured =
            parse_meter_value(&row(&["Wasserzähler", "15.6", "01.01.2020", ""])).unwrap();
        assert_eq!(measured.kind, ValueKind::Measured);
        let estimated =
            parse_meter_value(&row(&["Wasserzähler", "20.1", "01.02.2020", "Geschätzt"])).unwrap();
        assert_eq!(estimated.kind, ValueKind::Estimated);
    }

    #[test]
    fn test_parse_bci_row_unknown_split_fails() {
        let err = parse_bci(&row(&["Wohnung 1", "Nach Laune", "", "Strom", ""])).unwrap_err();
        assert!(format!("{err}").contains("Nach Laune"));
    }

    #[test]
    fn test_from_parts_filters_invoices_to_bill_range() {
        let bill_range = DateRange::new(d("01.01.2020"), d("31.12.2020"));
        let inside = Invoice {
            invoice_type: "Strom".into(),
            supplier: String::new(),
            invoice_number: "in".into(),
            date: d("01.01.2021"),
            notes: String::new(),
            range: DateRange::new(d("01.06.2020"), d("31.07.2020")),
            net: Amount::default(),
            amount: Decimal::ONE,
            tax: Decimal::ZERO,
            path: String::new(),
        };
        let mut outside = inside.clone();
        outside.invoice_number = "out".into();
        outside.range = DateRange::new(d("01.01.2019"), d("31.12.2019"));

        let input = BillInput::from_parts(
            vec![inside, outside],
            vec![sample_apartment("Wohnung 1")],
            vec![sample_tenant("Wohnung 1", "01.01.2019", None)],
            vec![],
            vec![],
            vec![],
            "Wohnung 1",
            &bill_range,
        )
        .unwrap();
        assert_eq!(input.invoices.len(), 1);
        assert_eq!(input.invoices[0].invoice_number, "in");
    }

    #[test]
    fn test_from_parts_missing_apartment_is_input_file_error() {
        let bill_range = DateRange::new(d("01.01.2020"), d("31.12.2020"));
        let err = BillInput::from_parts(
            vec![],
            vec![sample_apartment("Wohnung 1")],
            vec![],
            vec![],
            vec![],
            vec![],
            "Wohnung 2",
            &bill_range,
        )
        .unwrap_err();
        assert!(err.downcast_ref::<BillError>().is_some());
    }

    #[test]
    fn test_from_parts_tenant_must_cover_whole_range() {
        let bill_range = DateRange::new(d("01.01.2020"), d("31.12.2020"));
        let err = BillInput::from_parts(
            vec![],
            vec![sample_apartment("Wohnung 1")],
            vec![sample_tenant("Wohnung 1", "01.01.2019", Some("30.06.2020"))],
            vec![],
            vec![],
            vec![],
            "Wohnung 1",
            &bill_range,
        )
        .unwrap_err();
        assert!(format!("{err}").contains("whole bill range"));
    }

    #[test]
    fn test_from_parts_consumption_bci_needs_unit() {
        let bill_range = DateRange::new(d("01.01.2020"), d("31.12.2020"));
        let bci = BillCalculationItem {
            apartment: "Wohnung 1".into(),
            split: SplitType::PerConsumption,
            unit: String::new(),
            invoice_type: "Wasser".into(),
            meter: "Wasserzähler".into(),
        };
        let err = BillInput::from_parts(
            vec![],
            vec![sample_apartment("Wohnung 1")],
            vec![sample_tenant("Wohnung 1", "01.01.2019", None)],
            vec![],
            vec![],
            vec![bci],
            "Wohnung 1",
            &bill_range,
        )
        .unwrap_err();
        assert!(format!("{err}").contains("no unit"));
    }

    #[test]
    fn test_from_parts_keeps_only_this_apartments_bcis() {
        let bill_range = DateRange::new(d("01.01.2020"), d("31.12.2020"));
        let mine = BillCalculationItem {
            apartment: "Wohnung 1".into(),
            split: SplitType::Half,
            unit: String::new(),
            invoice_type: "Müll".into(),
            meter: String::new(),
        };
        let mut other = mine.clone();
        other.apartment = "Wohnung 2".into();
        let input = BillInput::from_parts(
            vec![],
            vec![sample_apartment("Wohnung 1")],
            vec![sample_tenant("Wohnung 1", "01.01.2019", None)],
            vec![],
            vec![],
            vec![mine, other],
            "Wohnung 1",
            &bill_range,
        )
        .unwrap();
        assert_eq!(input.bcis.len(), 1);
    }
}
