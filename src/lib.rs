pub mod args;
mod bill;
mod error;
mod meters;
pub mod model;
mod occupancy;
mod sheet;

pub use bill::{Bill, BillCreator, CoverageGap};
pub use error::{BillError, Error, LookupSide, Result};
pub use meters::{Interpolation, MeterManager};
pub use occupancy::people_count_changes;
pub use sheet::input::{BillInput, InputSheet};
pub use sheet::output::{ResultDoc, ResultSheet};
