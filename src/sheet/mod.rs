//! The workbook boundary: reading the input sheets, writing the result
//! document.

pub mod input;
pub mod output;
