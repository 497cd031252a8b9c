use crate::model::Date;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The fatal error kinds of a bill run. Anything that aborts a run is one of
/// these; callers can downcast from `anyhow::Error` to tell them apart.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BillError {
    /// The input workbook is missing something the run needs (an apartment,
    /// a tenant covering the bill range, a meter definition) or contains a
    /// value the engine cannot act on (unknown allocation rule, unit
    /// mismatch with no conversion).
    #[error("input file error: {0}")]
    InputFile(String),

    /// A meter reading was requested at a date with no bracketing reading
    /// before or after it. Not retried; the fix is adding data and rerunning.
    #[error("no reading for meter '{meter}' {side} {date}")]
    MeterLookup {
        meter: String,
        side: LookupSide,
        date: Date,
    },

    /// A cell could not be parsed into the value its column requires.
    #[error("invalid cell value: {0}")]
    InvalidCell(String),
}

/// Which side of the bracket was missing in a meter lookup.
#[derive(Debug, Clone, Copy, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupSide {
    Before,
    After,
}

serde_plain::derive_display_from_serialize!(LookupSide);
serde_plain::derive_fromstr_from_deserialize!(LookupSide);
