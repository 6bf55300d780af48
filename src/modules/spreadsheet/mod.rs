//! Spreadsheet parsing for grade imports.
//!
//! - [`reader`]: The [`SpreadsheetReader`] port and its structural errors
//! - [`workbook`]: [`WorkbookReader`], reading `.xlsx`/`.xls` with calamine and `.csv` with csv

pub mod reader;
pub mod workbook;

pub use reader::{SpreadsheetError, SpreadsheetReader};
pub use workbook::WorkbookReader;
