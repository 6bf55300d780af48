//! Spreadsheet import and template types.
//!
//! A [`ParsedSpreadsheet`] is what a spreadsheet reader hands to the import
//! reconciler. The reconciler answers with an [`ImportReport`] that lists one
//! [`ProcessedRow`] per input row, in input order.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::grade_record::GradeLetter;
use crate::ids::{ClassId, GradeId, StudentId, SubjectId};
use crate::statistics::GradeStatistics;

/// Column headers, compared case-insensitively.
pub mod columns {
    pub const FIRST_NAME: &str = "prenom";
    pub const LAST_NAME: &str = "nom";
    pub const STUDENT_NUMBER: &str = "numeroetudiant";
    pub const EMAIL: &str = "email";
    pub const NOTE_CC: &str = "noteCC";
    pub const NOTE_TP: &str = "noteTP";
    pub const NOTE_DV: &str = "noteDV";

    pub const REQUIRED: [&str; 3] = [FIRST_NAME, LAST_NAME, STUDENT_NUMBER];
    pub const NOTES: [&str; 3] = [NOTE_CC, NOTE_TP, NOTE_DV];
}

/// One validated spreadsheet row, notes already parsed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct SpreadsheetRow {
    /// Line number in the file, the header being line 1.
    pub row_number: usize,
    pub first_name: String,
    pub last_name: String,
    pub student_number: String,
    pub email: Option<String>,
    pub note_cc: Option<f64>,
    pub note_tp: Option<f64>,
    pub note_dv: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct ParsedSpreadsheet {
    pub rows: Vec<SpreadsheetRow>,
    pub has_tp_column: bool,
    /// Non-blank data rows in the file.
    pub total_rows: usize,
    pub valid_rows: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
pub struct ImportRequest {
    pub subject_id: SubjectId,
    pub class_id: ClassId,
    #[serde(default)]
    pub overwrite_existing: bool,
    /// Run matching and duplicate detection without writing anything.
    #[serde(default)]
    pub validate_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Created,
    Updated,
    SkippedDuplicate,
    FailedNotFound,
    FailedError,
}

/// Audit entry for one input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProcessedRow {
    pub row_number: usize,
    pub status: RowStatus,
    pub student_id: Option<StudentId>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub student_number: String,
    pub note_cc: Option<f64>,
    pub note_tp: Option<f64>,
    pub note_dv: Option<f64>,
    pub is_existing_student: bool,
    pub is_existing_note: bool,
    pub final_grade: Option<f64>,
    pub is_passed: Option<bool>,
    pub grade_letter: Option<GradeLetter>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ProcessedRow {
    /// Entry for a row before it is resolved against the roster.
    pub fn pending(row: &SpreadsheetRow) -> Self {
        Self {
            row_number: row.row_number,
            status: RowStatus::FailedError,
            student_id: None,
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            email: row.email.clone(),
            student_number: row.student_number.clone(),
            note_cc: row.note_cc,
            note_tp: row.note_tp,
            note_dv: row.note_dv,
            is_existing_student: false,
            is_existing_note: false,
            final_grade: None,
            is_passed: None,
            grade_letter: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// A grade written (or, in a dry run, that would be written) by an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImportedGrade {
    pub id: Option<GradeId>,
    pub student_id: StudentId,
    pub student_full_name: String,
    pub student_number: String,
    pub note_cc: Option<f64>,
    pub note_tp: Option<f64>,
    pub note_dv: Option<f64>,
    pub note_finale: Option<f64>,
    pub grade_letter: GradeLetter,
    pub is_passed: bool,
    pub is_updated: bool,
    pub is_created: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct ImportReport {
    pub total_rows: usize,
    pub valid_rows: usize,
    /// Rows that reached the write step, whatever its outcome.
    pub processed_rows: usize,
    pub successful_imports: usize,
    pub failed_imports: usize,
    pub skipped_duplicates: usize,
    pub updated_notes: usize,
    pub created_notes: usize,
    pub students_not_found: usize,
    pub has_tp_component: bool,
    pub validate_only: bool,
    /// Computed over the successfully imported rows only.
    pub statistics: GradeStatistics,
    pub imported_notes: Vec<ImportedGrade>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub processing_details: Vec<ProcessedRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Starting,
    Validating,
    Parsing,
    Processing,
    Finalizing,
    Completed,
}

/// Advisory progress checkpoint emitted during an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImportProgress {
    pub stage: ImportStage,
    /// 0 to 100.
    pub progress: u8,
    pub message: String,
    pub current_row: Option<usize>,
    pub total_rows: Option<usize>,
}

impl ImportProgress {
    pub fn new(stage: ImportStage, progress: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress,
            message: message.into(),
            current_row: None,
            total_rows: None,
        }
    }

    /// Processing checkpoint; progress runs from 50 to 85 across the rows.
    pub fn processing(current_row: usize, total_rows: usize) -> Self {
        let share = if total_rows == 0 {
            1.0
        } else {
            current_row as f64 / total_rows as f64
        };

        Self {
            stage: ImportStage::Processing,
            progress: 50 + (share * 35.0).round() as u8,
            message: format!("Processing row {current_row} of {total_rows}"),
            current_row: Some(current_row),
            total_rows: Some(total_rows),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, IntoParams, ToSchema)]
pub struct TemplateRequest {
    pub subject_id: SubjectId,
    pub class_id: ClassId,
    #[serde(default)]
    pub include_existing_notes: bool,
    #[serde(default)]
    pub include_student_emails: bool,
}

/// One roster student in a template, optionally pre-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemplateStudentRow {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub student_number: String,
    pub note_cc: Option<f64>,
    pub note_tp: Option<f64>,
    pub note_dv: Option<f64>,
}

/// Import template contents. Encoding to a file is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Template {
    pub filename: String,
    pub headers: Vec<String>,
    pub sample_data: Vec<Vec<String>>,
    pub students: Vec<TemplateStudentRow>,
    pub has_tp_component: bool,
    pub include_student_emails: bool,
    pub subject_name: String,
    pub class_name: String,
}

impl Template {
    /// Student rows laid out in header order, empty cells for absent values.
    pub fn student_cells(&self) -> Vec<Vec<String>> {
        let note = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();

        self.students
            .iter()
            .map(|s| {
                let mut cells = vec![
                    s.first_name.clone(),
                    s.last_name.clone(),
                    s.student_number.clone(),
                ];
                if self.include_student_emails {
                    cells.push(s.email.clone().unwrap_or_default());
                }
                cells.push(note(s.note_cc));
                if self.has_tp_component {
                    cells.push(note(s.note_tp));
                }
                cells.push(note(s.note_dv));
                cells
            })
            .collect()
    }
}
