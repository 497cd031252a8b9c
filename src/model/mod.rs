//! Types that represent the core data model, such as `Invoice` and `Tenant`.
mod amount;
mod bci;
mod coverage;
mod date;
mod invoice;
mod meter;
mod tenant;

pub use amount::{Amount, AmountFormat};
pub use bci::{BillCalculationItem, SplitType};
pub use coverage::DateCoverage;
pub use date::{Date, DateRange};
pub use invoice::Invoice;
pub use meter::{Meter, MeterValue, ValueKind};
pub use tenant::{Apartment, Tenant};
