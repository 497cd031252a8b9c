//! The result document.
//!
//! Three sheets are built in memory — overview, details, meter values — and
//! flushed to CSV files at the end of the run. Rows are numbered the way a
//! spreadsheet numbers them (header is row 1, data starts at row 2) because
//! the interpolation expressions written into the meter-value sheet refer to
//! rows by that numbering. Computed meter rows are written first as stubs and
//! updated in place once their bracketing rows are known, which is why the
//! whole document stays in memory until `save`.

use crate::error::Result;
use crate::model::Date;
use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// The sheets of the result document. The names are the German sheet names
/// of the original workbook and become CSV file-name suffixes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSheet {
    Overview,
    Details,
    MeterValues,
}

serde_plain::derive_display_from_serialize!(ResultSheet);
serde_plain::derive_fromstr_from_deserialize!(ResultSheet);

impl ResultSheet {
    /// The sheet name, used in cross-sheet cell references.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            ResultSheet::Overview => "Zusammenfassung",
            ResultSheet::Details => "Details",
            ResultSheet::MeterValues => "Zählerstände",
        }
    }

    fn file_suffix(&self) -> &'static str {
        match self {
            ResultSheet::Overview => "zusammenfassung",
            ResultSheet::Details => "details",
            ResultSheet::MeterValues => "zaehlerstaende",
        }
    }

    fn headers(&self) -> &'static [&'static str] {
        match self {
            ResultSheet::Overview => &["", "", "Monatlich", "Summe"],
            ResultSheet::Details => &[
                "Von",
                "Bis",
                "Tage",
                "Art",
                "Bemerkung",
                "Zähler",
                "Netto",
                "Menge",
                "Steuersatz",
                "Brutto",
                "Rechnungstage",
                "Umlageschlüssel",
                "Anteil",
                "Betrag",
                "Beleg",
            ],
            ResultSheet::MeterValues => &["Zähler", "Datum", "Stand", "Art", "Formel"],
        }
    }
}

/// One sheet's cells. Data rows only; the header row is implicit.
#[derive(Debug, Clone, Default)]
struct SheetGrid {
    rows: Vec<Vec<String>>,
}

impl SheetGrid {
    /// Appends an empty data row and returns its 1-based sheet row number
    /// (the first data row is row 2, below the header).
    fn push_row(&mut self) -> u32 {
        self.rows.push(Vec::new());
        self.rows.len() as u32 + 1
    }

    /// Sets a cell by sheet row number and 1-based column.
    fn set(&mut self, row: u32, column: usize, value: String) {
        let idx = row as usize - 2;
        let cells = &mut self.rows[idx];
        if cells.len() < column {
            cells.resize(column, String::new());
        }
        cells[column - 1] = value;
    }
}

/// The in-memory result document.
#[derive(Debug, Clone, Default)]
pub struct ResultDoc {
    overview: SheetGrid,
    details: SheetGrid,
    meter_values: SheetGrid,
}

impl ResultDoc {
    pub fn new() -> Self {
        Self::default()
    }

    fn grid(&mut self, sheet: ResultSheet) -> &mut SheetGrid {
        match sheet {
            ResultSheet::Overview => &mut self.overview,
            ResultSheet::Details => &mut self.details,
            ResultSheet::MeterValues => &mut self.meter_values,
        }
    }

    fn grid_ref(&self, sheet: ResultSheet) -> &SheetGrid {
        match sheet {
            ResultSheet::Overview => &self.overview,
            ResultSheet::Details => &self.details,
            ResultSheet::MeterValues => &self.meter_values,
        }
    }

    /// Starts a new row in `sheet`. Cells are committed as they are written.
    pub fn row_writer(&mut self, sheet: ResultSheet) -> RowWriter<'_> {
        let grid = self.grid(sheet);
        let row = grid.push_row();
        RowWriter {
            grid,
            row,
            column: 1,
        }
    }

    /// Updates a single cell of an already-written row.
    pub fn cell_writer(&mut self, sheet: ResultSheet, row: u32, column: usize) -> CellWriter<'_> {
        CellWriter {
            grid: self.grid(sheet),
            row,
            column,
        }
    }

    /// The number of data rows currently in `sheet`.
    pub fn row_count(&self, sheet: ResultSheet) -> usize {
        self.grid_ref(sheet).rows.len()
    }

    /// The cells of a data row, for inspection. Row numbering matches
    /// `row_writer` (first data row is 2).
    pub fn row(&self, sheet: ResultSheet, row: u32) -> Option<&[String]> {
        self.grid_ref(sheet)
            .rows
            .get(row as usize - 2)
            .map(|cells| cells.as_slice())
    }

    /// Writes each sheet to `<stem>-<sheet>.csv` and returns the paths.
    pub fn save(&self, stem: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for sheet in [
            ResultSheet::Overview,
            ResultSheet::Details,
            ResultSheet::MeterValues,
        ] {
            let path = csv_path(stem, sheet);
            info!("Writing {} ...", path.display());
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&path)
                .with_context(|| format!("Unable to create {}", path.display()))?;
            writer
                .write_record(sheet.headers())
                .context("Unable to write CSV header")?;
            for row in &self.grid_ref(sheet).rows {
                writer
                    .write_record(row)
                    .with_context(|| format!("Unable to write to {}", path.display()))?;
            }
            writer
                .flush()
                .with_context(|| format!("Unable to flush {}", path.display()))?;
            written.push(path);
        }
        Ok(written)
    }
}

fn csv_path(stem: &Path, sheet: ResultSheet) -> PathBuf {
    let mut name = stem.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    name.push('-');
    name.push_str(sheet.file_suffix());
    name.push_str(".csv");
    stem.with_file_name(name)
}

/// Writes one cell at a fixed position.
pub struct CellWriter<'a> {
    grid: &'a mut SheetGrid,
    row: u32,
    column: usize,
}

impl CellWriter<'_> {
    pub fn write(&mut self, content: impl Into<String>) {
        self.grid.set(self.row, self.column, content.into());
    }

    pub fn write_number(&mut self, number: Decimal, precision: u32, unit: Option<&str>) {
        self.grid
            .set(self.row, self.column, fmt_number(number, precision, unit));
    }
}

/// Writes cells left to right into one row.
pub struct RowWriter<'a> {
    grid: &'a mut SheetGrid,
    row: u32,
    column: usize,
}

impl RowWriter<'_> {
    /// The sheet row number this writer is filling.
    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn write(&mut self, content: impl Into<String>) {
        self.grid.set(self.row, self.column, content.into());
        self.column += 1;
    }

    pub fn write_date(&mut self, date: Date) {
        self.write(date.to_string());
    }

    pub fn write_number(&mut self, number: Decimal, precision: u32, unit: Option<&str>) {
        self.write(fmt_number(number, precision, unit));
    }

    pub fn write_currency(&mut self, number: Decimal) {
        self.write(format!("{:.2} €", number.round_dp(2)));
    }
}

fn fmt_number(number: Decimal, precision: u32, unit: Option<&str>) -> String {
    let rounded = number.round_dp(precision);
    match unit {
        Some(unit) => format!("{rounded} {unit}"),
        None => rounded.to_string(),
    }
}

/// The interpolation expression for a computed meter row, phrased against
/// the rows the bracketing readings were written to. Opaque output text;
/// nothing in this program evaluates it.
pub fn count_formula(before_row: u32, after_row: u32, date_row: u32) -> String {
    let delta_value = format!("C{after_row}-C{before_row}");
    let delta_days_total = format!("_xlfn.days(B{after_row},B{before_row})");
    let delta_days_new = format!("_xlfn.days(B{date_row},B{before_row})");
    format!("=C{before_row}+({delta_value})/{delta_days_total}*{delta_days_new}")
}

/// The consumption expression for a by-consumption bill item: the meter
/// count at the billed range's end minus the count at its begin.
pub fn consumption_formula(begin_row: u32, end_row: u32) -> String {
    let sheet = ResultSheet::MeterValues.sheet_name();
    format!("={sheet}!C{end_row}-{sheet}!C{begin_row}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_rows_are_numbered_from_two() {
        let mut doc = ResultDoc::new();
        let mut row = doc.row_writer(ResultSheet::Details);
        assert_eq!(row.row(), 2);
        row.write("a");
        let row2 = doc.row_writer(ResultSheet::Details);
        assert_eq!(row2.row(), 3);
        assert_eq!(doc.row_count(ResultSheet::Details), 2);
    }

    #[test]
    fn test_cell_update_after_write() {
        let mut doc = ResultDoc::new();
        let mut row = doc.row_writer(ResultSheet::MeterValues);
        row.write("Wasserzähler");
        row.write("01.01.2020");
        row.write("");
        row.write("");
        let row_num = row.row();

        doc.cell_writer(ResultSheet::MeterValues, row_num, 3)
            .write_number(Decimal::from_str("33.66").unwrap(), 2, Some("m³"));
        doc.cell_writer(ResultSheet::MeterValues, row_num, 4)
            .write("Berechnet");

        let cells = doc.row(ResultSheet::MeterValues, row_num).unwrap();
        assert_eq!(cells[2], "33.66 m³");
        assert_eq!(cells[3], "Berechnet");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(fmt_number(Decimal::from_str("1.005").unwrap(), 2, None), "1.00");
        assert_eq!(fmt_number(Decimal::from_str("12").unwrap(), 0, Some("Tage")), "12 Tage");
    }

    #[test]
    fn test_count_formula() {
        assert_eq!(
            count_formula(2, 5, 3),
            "=C2+(C5-C2)/_xlfn.days(B5,B2)*_xlfn.days(B3,B2)"
        );
    }

    #[test]
    fn test_consumption_formula() {
        assert_eq!(
            consumption_formula(2, 4),
            "=Zählerstände!C4-Zählerstände!C2"
        );
    }

    #[test]
    fn test_save_writes_three_csv_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let stem = dir.path().join("Wohnung_1-01_01_2020-31_12_2020");

        let mut doc = ResultDoc::new();
        let mut row = doc.row_writer(ResultSheet::Details);
        row.write("01.01.2020");
        row.write("31.12.2020");

        let paths = doc.save(&stem).unwrap();
        assert_eq!(paths.len(), 3);
        for path in &paths {
            assert!(path.is_file());
        }
        let details = std::fs::read_to_string(&paths[1]).unwrap();
        assert!(details.starts_with("Von,Bis,"));
        assert!(details.contains("01.01.2020,31.12.2020"));
    }
}
