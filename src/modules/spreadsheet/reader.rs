use gradebook_models::ParsedSpreadsheet;
use thiserror::Error;

/// Errors that make a whole file unusable. Problems confined to one row are
/// reported in [`ParsedSpreadsheet::errors`] instead.
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("Unsupported file format: expected .xlsx, .xls or .csv")]
    UnsupportedFormat,

    #[error("Failed to open workbook: {0}")]
    Workbook(String),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook has no worksheets")]
    NoWorksheet,

    #[error("Spreadsheet is empty")]
    Empty,

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("At least one note column is required (noteCC, noteTP, noteDV)")]
    NoNoteColumns,

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Too many rows: {found} (maximum {max})")]
    TooManyRows { found: usize, max: usize },
}

/// Turns an uploaded file into validated rows.
pub trait SpreadsheetReader: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedSpreadsheet, SpreadsheetError>;
}
