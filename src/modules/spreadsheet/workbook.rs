use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use tracing::{debug, instrument};

use gradebook_models::component::{MAX_SCORE, MIN_SCORE, round2};
use gradebook_models::import::columns;
use gradebook_models::{ParsedSpreadsheet, SpreadsheetRow};

use super::reader::{SpreadsheetError, SpreadsheetReader};

const XLSX_SIGNATURE: &[u8] = b"PK\x03\x04";
const XLS_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Text content, with whole numbers printed without a decimal part so a
    /// numeric student number reads back as typed.
    fn text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::Error(_) | Data::Empty => Cell::Empty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    FirstName,
    LastName,
    StudentNumber,
    Email,
    NoteCc,
    NoteTp,
    NoteDv,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        let column = match header.trim().to_lowercase().as_str() {
            "prenom" => Column::FirstName,
            "nom" => Column::LastName,
            "numeroetudiant" => Column::StudentNumber,
            "email" => Column::Email,
            "notecc" => Column::NoteCc,
            "notetp" => Column::NoteTp,
            "notedv" => Column::NoteDv,
            _ => return None,
        };
        Some(column)
    }

    fn name(self) -> &'static str {
        match self {
            Column::FirstName => columns::FIRST_NAME,
            Column::LastName => columns::LAST_NAME,
            Column::StudentNumber => columns::STUDENT_NUMBER,
            Column::Email => columns::EMAIL,
            Column::NoteCc => columns::NOTE_CC,
            Column::NoteTp => columns::NOTE_TP,
            Column::NoteDv => columns::NOTE_DV,
        }
    }
}

/// Reads grade spreadsheets from `.xlsx`, `.xls` and `.csv` uploads.
///
/// Only the first worksheet is read. Line 1 holds the headers, matched
/// case-insensitively; `prenom`, `nom` and `numeroetudiant` are required
/// along with at least one of `noteCC`, `noteTP` and `noteDV`.
#[derive(Debug, Clone)]
pub struct WorkbookReader {
    max_rows: usize,
}

impl WorkbookReader {
    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }

    fn read_grid(&self, bytes: &[u8]) -> Result<Vec<Vec<Cell>>, SpreadsheetError> {
        if bytes.starts_with(XLSX_SIGNATURE) || bytes.starts_with(XLS_SIGNATURE) {
            return read_workbook(bytes);
        }

        match std::str::from_utf8(bytes) {
            Ok(text) => read_csv(text),
            Err(_) => Err(SpreadsheetError::UnsupportedFormat),
        }
    }
}

impl SpreadsheetReader for WorkbookReader {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    fn parse(&self, bytes: &[u8]) -> Result<ParsedSpreadsheet, SpreadsheetError> {
        let grid = self.read_grid(bytes)?;

        let mut lines = grid.into_iter().enumerate();
        let header = match lines.next() {
            Some((_, header)) if !header.iter().all(Cell::is_blank) => header,
            _ => return Err(SpreadsheetError::Empty),
        };

        let mut parsed = ParsedSpreadsheet::default();
        let layout = HeaderLayout::parse(&header, &mut parsed.warnings)?;
        parsed.has_tp_column = layout.has(Column::NoteTp);

        let data: Vec<(usize, Vec<Cell>)> = lines
            .filter(|(_, cells)| !cells.iter().all(Cell::is_blank))
            .map(|(index, cells)| (index + 1, cells))
            .collect();

        if data.len() > self.max_rows {
            return Err(SpreadsheetError::TooManyRows {
                found: data.len(),
                max: self.max_rows,
            });
        }
        parsed.total_rows = data.len();

        for (line, cells) in &data {
            if let Some(row) = layout.read_row(*line, cells, &mut parsed) {
                parsed.rows.push(row);
            }
        }
        parsed.valid_rows = parsed.rows.len();

        debug!(
            total_rows = parsed.total_rows,
            valid_rows = parsed.valid_rows,
            has_tp_column = parsed.has_tp_column,
            "Spreadsheet parsed"
        );

        Ok(parsed)
    }
}

/// Column positions found on the header line.
struct HeaderLayout {
    positions: HashMap<Column, usize>,
}

impl HeaderLayout {
    fn parse(header: &[Cell], warnings: &mut Vec<String>) -> Result<Self, SpreadsheetError> {
        let mut positions = HashMap::new();

        for (index, cell) in header.iter().enumerate() {
            let Some(title) = cell.text() else { continue };
            match Column::from_header(&title) {
                Some(column) => {
                    if positions.insert(column, index).is_some() {
                        return Err(SpreadsheetError::DuplicateColumn(column.name().to_string()));
                    }
                }
                None => warnings.push(format!("Unknown column '{title}' ignored")),
            }
        }

        let found: HashSet<&str> = positions.keys().map(|c| c.name()).collect();

        let missing: Vec<String> = columns::REQUIRED
            .into_iter()
            .filter(|name| !found.contains(name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(SpreadsheetError::MissingColumns(missing));
        }

        if !columns::NOTES.into_iter().any(|name| found.contains(name)) {
            return Err(SpreadsheetError::NoNoteColumns);
        }

        Ok(Self { positions })
    }

    fn has(&self, column: Column) -> bool {
        self.positions.contains_key(&column)
    }

    fn cell<'a>(&self, cells: &'a [Cell], column: Column) -> Option<&'a Cell> {
        self.positions.get(&column).and_then(|i| cells.get(*i))
    }

    fn text(&self, cells: &[Cell], column: Column) -> Option<String> {
        self.cell(cells, column).and_then(Cell::text)
    }

    /// Reads one data line. Problems are appended to `parsed`; `None` drops the row.
    fn read_row(
        &self,
        line: usize,
        cells: &[Cell],
        parsed: &mut ParsedSpreadsheet,
    ) -> Option<SpreadsheetRow> {
        let first_name = self.text(cells, Column::FirstName);
        let last_name = self.text(cells, Column::LastName);
        let student_number = self.text(cells, Column::StudentNumber);

        let mut row_errors = Vec::new();
        for (column, value) in [
            (Column::FirstName, &first_name),
            (Column::LastName, &last_name),
            (Column::StudentNumber, &student_number),
        ] {
            if value.is_none() {
                row_errors.push(format!("Row {line}: Missing required field '{}'", column.name()));
            }
        }

        let mut notes = [None; 3];
        for (slot, column) in notes
            .iter_mut()
            .zip([Column::NoteCc, Column::NoteTp, Column::NoteDv])
        {
            match self.note(line, cells, column, &mut parsed.warnings) {
                Ok(value) => *slot = value,
                Err(message) => row_errors.push(message),
            }
        }

        if !row_errors.is_empty() {
            parsed.errors.extend(row_errors);
            return None;
        }

        let [note_cc, note_tp, note_dv] = notes;
        if note_cc.is_none() && note_tp.is_none() && note_dv.is_none() {
            parsed.warnings.push(format!("Row {line}: No notes provided"));
        }

        Some(SpreadsheetRow {
            row_number: line,
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
            student_number: student_number.unwrap_or_default(),
            email: self.text(cells, Column::Email),
            note_cc,
            note_tp,
            note_dv,
        })
    }

    fn note(
        &self,
        line: usize,
        cells: &[Cell],
        column: Column,
        warnings: &mut Vec<String>,
    ) -> Result<Option<f64>, String> {
        let name = column.name();
        let value = match self.cell(cells, column) {
            None | Some(Cell::Empty) => return Ok(None),
            Some(Cell::Number(n)) => *n,
            Some(Cell::Text(raw)) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Ok(None);
                }
                raw.replace(',', ".")
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| format!("Row {line}: Invalid {name} value '{raw}'"))?
            }
        };

        if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
            return Err(format!("Row {line}: {name} out of range (0-20)"));
        }

        let rounded = round2(value);
        if (rounded - value).abs() > 1e-9 {
            warnings.push(format!(
                "Row {line}: {name} value {value} rounded to {rounded}"
            ));
        }

        Ok(Some(rounded))
    }
}

fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<Cell>>, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| SpreadsheetError::Workbook(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    let first_sheet = sheet_names.first().ok_or(SpreadsheetError::NoWorksheet)?;

    let range = workbook
        .worksheet_range(first_sheet)
        .map_err(|e| SpreadsheetError::Workbook(e.to_string()))?;

    // Ranges start at the first used cell; pad so line numbers match the sheet.
    let top = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let left = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let mut grid: Vec<Vec<Cell>> = vec![Vec::new(); top];
    grid.extend(range.rows().map(|row| {
        std::iter::repeat_n(Cell::Empty, left)
            .chain(row.iter().map(Cell::from))
            .collect()
    }));

    Ok(grid)
}

fn read_csv(text: &str) -> Result<Vec<Vec<Cell>>, SpreadsheetError> {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(detect_delimiter(text))
        .from_reader(text.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(grid)
}

/// Semicolon-separated files are common where the decimal separator is a comma.
fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str) -> Result<ParsedSpreadsheet, SpreadsheetError> {
        WorkbookReader::new(1000).parse(csv.as_bytes())
    }

    #[test]
    fn test_parse_valid_csv() {
        let parsed = parse(
            "prenom,nom,numeroetudiant,noteCC,noteDV\n\
             Ahmed,Ben Ali,2024001,14,16\n\
             Fatima,Zahra,2024002,12.5,\n",
        )
        .unwrap();

        assert_eq!(parsed.total_rows, 2);
        assert_eq!(parsed.valid_rows, 2);
        assert!(!parsed.has_tp_column);
        assert!(parsed.errors.is_empty());

        let first = &parsed.rows[0];
        assert_eq!(first.row_number, 2);
        assert_eq!(first.student_number, "2024001");
        assert_eq!(first.note_cc, Some(14.0));
        assert_eq!(first.note_dv, Some(16.0));
        assert_eq!(parsed.rows[1].note_dv, None);
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let parsed = parse("PRENOM, Nom ,NumeroEtudiant,NOTETP\nA,B,1,10\n").unwrap();
        assert!(parsed.has_tp_column);
        assert_eq!(parsed.rows[0].note_tp, Some(10.0));
    }

    #[test]
    fn test_semicolon_csv_with_comma_decimals() {
        let parsed = parse("prenom;nom;numeroetudiant;noteCC\nA;B;1;15,5\n").unwrap();
        assert_eq!(parsed.rows[0].note_cc, Some(15.5));
    }

    #[test]
    fn test_missing_required_column() {
        let err = parse("prenom,numeroetudiant,noteCC\nA,1,10\n").unwrap_err();
        assert!(matches!(err, SpreadsheetError::MissingColumns(ref c) if c.len() == 1 && c[0] == "nom"));
    }

    #[test]
    fn test_requires_a_note_column() {
        let err = parse("prenom,nom,numeroetudiant\nA,B,1\n").unwrap_err();
        assert!(matches!(err, SpreadsheetError::NoNoteColumns));
    }

    #[test]
    fn test_duplicate_header() {
        let err = parse("prenom,nom,numeroetudiant,noteCC,NOTECC\n").unwrap_err();
        assert!(matches!(err, SpreadsheetError::DuplicateColumn(ref c) if c == "noteCC"));
    }

    #[test]
    fn test_row_errors_drop_the_row() {
        let parsed = parse(
            "prenom,nom,numeroetudiant,noteCC,noteDV\n\
             A,B,1,25,10\n\
             C,,2,10,10\n\
             E,F,3,abc,10\n\
             G,H,4,10,10\n",
        )
        .unwrap();

        assert_eq!(parsed.total_rows, 4);
        assert_eq!(parsed.valid_rows, 1);
        assert_eq!(parsed.rows[0].student_number, "4");
        assert_eq!(
            parsed.errors,
            vec![
                "Row 2: noteCC out of range (0-20)".to_string(),
                "Row 3: Missing required field 'nom'".to_string(),
                "Row 4: Invalid noteCC value 'abc'".to_string(),
            ]
        );
    }

    #[test]
    fn test_rounding_and_empty_note_warnings() {
        let parsed = parse(
            "prenom,nom,numeroetudiant,noteCC\n\
             A,B,1,12.3456\n\
             C,D,2,\n",
        )
        .unwrap();

        assert_eq!(parsed.rows[0].note_cc, Some(12.35));
        assert_eq!(parsed.valid_rows, 2);
        assert!(parsed.warnings[0].starts_with("Row 2: noteCC value 12.3456 rounded to 12.35"));
        assert_eq!(parsed.warnings[1], "Row 3: No notes provided");
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let parsed = parse("prenom,nom,numeroetudiant,noteCC\n,,,\nA,B,1,10\n").unwrap();
        assert_eq!(parsed.total_rows, 1);
        assert_eq!(parsed.rows[0].row_number, 3);
    }

    #[test]
    fn test_too_many_rows() {
        let reader = WorkbookReader::new(1);
        let err = reader
            .parse(b"prenom,nom,numeroetudiant,noteCC\nA,B,1,10\nC,D,2,11\n")
            .unwrap_err();
        assert!(matches!(err, SpreadsheetError::TooManyRows { found: 2, max: 1 }));
    }

    #[test]
    fn test_empty_and_unsupported_input() {
        assert!(matches!(parse(""), Err(SpreadsheetError::Empty)));
        assert!(matches!(
            WorkbookReader::new(10).parse(&[0xFF, 0xFE, 0x00, 0x81]),
            Err(SpreadsheetError::UnsupportedFormat)
        ));
        assert!(matches!(
            WorkbookReader::new(10).parse(b"PK\x03\x04not-a-zip"),
            Err(SpreadsheetError::Workbook(_))
        ));
    }

    #[test]
    fn test_numeric_student_number_cell() {
        assert_eq!(Cell::Number(2024001.0).text().as_deref(), Some("2024001"));
        assert_eq!(Cell::Text("  ".into()).text(), None);
    }
}
