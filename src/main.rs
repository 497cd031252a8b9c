use anyhow::{ensure, Context};
use clap::Parser;
use nebenkosten::args::Args;
use nebenkosten::model::DateRange;
use nebenkosten::{BillCreator, BillInput, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    ensure!(
        args.begin() <= args.end(),
        "the billing period ends ({}) before it begins ({})",
        args.end(),
        args.begin()
    );
    let bill_range = DateRange::new(args.begin(), args.end());

    let input = BillInput::load(args.input(), args.apartment(), &bill_range)?;
    let bill = BillCreator::new(&input, bill_range).create()?;

    let stem = args.output_dir().join(output_stem(args.apartment(), &bill_range));
    for path in bill.doc.save(&stem)? {
        info!("Wrote {}", path.display());
    }

    // Receipt paths in the workbook are relative to the workbook itself.
    let receipts_source = args.input().parent().unwrap_or(Path::new("."));
    copy_receipts(receipts_source, &stem, &bill.receipts)?;
    Ok(())
}

/// The file-name stem of the result files: apartment and period, with the
/// characters that make shells unhappy replaced.
fn output_stem(apartment: &str, range: &DateRange) -> String {
    sanitize(&format!("{apartment}-{}-{}", range.begin, range.end))
}

fn sanitize(name: &str) -> String {
    name.replace([' ', '.'], "_")
}

/// Copies every receipt the bill references into `<stem>-receipts/` so the
/// bill can be handed over as one self-contained bundle. A missing receipt
/// file is reported but does not fail the finished bill.
fn copy_receipts(source_dir: &Path, stem: &Path, receipts: &BTreeSet<String>) -> Result<()> {
    if receipts.is_empty() {
        return Ok(());
    }
    let target_dir = receipts_dir(stem);
    std::fs::create_dir_all(&target_dir)
        .with_context(|| format!("Unable to create {}", target_dir.display()))?;

    for receipt in receipts {
        let source = source_dir.join(receipt);
        if !source.is_file() {
            warn!("Receipt {} does not exist, skipping.", source.display());
            continue;
        }
        let file_name = source
            .file_name()
            .with_context(|| format!("Receipt path {} has no file name", source.display()))?;
        let target = target_dir.join(file_name);
        std::fs::copy(&source, &target).with_context(|| {
            format!("Unable to copy {} to {}", source.display(), target.display())
        })?;
        debug!("Copied {} to {}", source.display(), target.display());
    }
    info!("Copied receipts to {}", target_dir.display());
    Ok(())
}

fn receipts_dir(stem: &Path) -> PathBuf {
    let mut name = stem
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str("-receipts");
    stem.with_file_name(name)
}

/// Initializes the tracing subscriber.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebenkosten::model::Date;
    use std::str::FromStr;

    #[test]
    fn test_output_stem_replaces_spaces_and_dots() {
        let range = DateRange::new(
            Date::from_str("01.01.2020").unwrap(),
            Date::from_str("31.12.2020").unwrap(),
        );
        assert_eq!(
            output_stem("Wohnung 1", &range),
            "Wohnung_1-01_01_2020-31_12_2020"
        );
    }

    #[test]
    fn test_copy_receipts() {
        let source = tempfile::TempDir::new().unwrap();
        std::fs::write(source.path().join("r-001.pdf"), b"pdf").unwrap();

        let out = tempfile::TempDir::new().unwrap();
        let stem = out.path().join("Wohnung_1-01_01_2020-31_12_2020");

        let receipts: BTreeSet<String> =
            ["r-001.pdf".to_string(), "missing.pdf".to_string()].into();
        copy_receipts(source.path(), &stem, &receipts).unwrap();

        let copied = receipts_dir(&stem).join("r-001.pdf");
        assert!(copied.is_file());
        assert!(!receipts_dir(&stem).join("missing.pdf").exists());
    }

    #[test]
    fn test_copy_receipts_none_creates_nothing() {
        let out = tempfile::TempDir::new().unwrap();
        let stem = out.path().join("stem");
        copy_receipts(Path::new("."), &stem, &BTreeSet::new()).unwrap();
        assert!(!receipts_dir(&stem).exists());
    }
}
