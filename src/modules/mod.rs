pub mod grades;
pub mod spreadsheet;
