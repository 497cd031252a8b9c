//! The CLI interface.

use crate::model::Date;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// nebenkosten: creates a German operating-cost bill (Nebenkostenabrechnung)
/// for one apartment and billing period.
///
/// The input is a single .xlsx workbook maintained by the landlord, with one
/// sheet per entity (Rechnungen, Wohnungen, Mieter, Zählerstände, Zähler,
/// Abrechnungseinstellungen). The result is written next to nothing else:
/// three CSV files (overview, details, meter values) named after the
/// apartment and period, plus a directory with copies of all receipts the
/// bill references.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    /// The input workbook (.xlsx).
    #[arg(long, short, env = "NEBENKOSTEN_INPUT")]
    input: PathBuf,

    /// The apartment to bill, as named in the Wohnungen sheet.
    #[arg(long, short)]
    apartment: String,

    /// The first day of the billing period, inclusive, as DD.MM.YYYY.
    #[arg(long)]
    begin: Date,

    /// The last day of the billing period, inclusive, as DD.MM.YYYY.
    #[arg(long)]
    end: Date,

    /// The directory the result files are written to.
    #[arg(long, short, default_value = ".")]
    output_dir: PathBuf,

    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate
    /// for the filter syntax.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,
}

impl Args {
    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn apartment(&self) -> &str {
        &self.apartment
    }

    pub fn begin(&self) -> Date {
        self.begin
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "nebenkosten",
            "--input",
            "haus.xlsx",
            "--apartment",
            "Wohnung 1",
            "--begin",
            "01.01.2020",
            "--end",
            "31.12.2020",
        ])
        .unwrap();
        assert_eq!(args.apartment(), "Wohnung 1");
        assert_eq!(args.begin(), Date::from_str("01.01.2020").unwrap());
        assert_eq!(args.end(), Date::from_str("31.12.2020").unwrap());
        assert_eq!(args.output_dir(), Path::new("."));
        assert_eq!(args.log_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_parse_args_rejects_iso_dates() {
        let result = Args::try_parse_from([
            "nebenkosten",
            "--input",
            "haus.xlsx",
            "--apartment",
            "Wohnung 1",
            "--begin",
            "2020-01-01",
            "--end",
            "31.12.2020",
        ]);
        assert!(result.is_err());
    }
}
