//! Spreadsheet import: matching rows against the class roster and writing
//! grades row by row.
//!
//! Each row ends in exactly one [`RowOutcome`]. The outcomes are folded into
//! an [`ImportLedger`], which becomes the [`ImportReport`]. A failing row
//! never stops the rows after it; only structural problems (unknown subject
//! or class, empty roster, unreadable file or one without a valid row,
//! missing configuration) abort the import, and they do so before any row is
//! written.

use std::collections::HashMap;

use anyhow::anyhow;
use tracing::{Instrument, debug, warn};

use gradebook_core::AppError;
use gradebook_models::ids::{StudentId, SubjectId, TeacherId};
use gradebook_models::{
    ComponentPatch, ComponentScores, GradeConfig, GradeRecord, GradeStatistics, ImportProgress,
    ImportReport, ImportRequest, ImportStage, ImportedGrade, ParsedSpreadsheet, Patch,
    ProcessedRow, RowStatus, SpreadsheetRow, Student,
};

use super::service::{GradeService, validation_error};
use super::store::{GradeStore, StoreError};
use crate::modules::spreadsheet::SpreadsheetReader;
use crate::utils::tracing::{record_error, record_success};
use crate::{audit_event, business_span};

/// Receives advisory progress checkpoints during an import.
pub type ProgressCallback<'a> = dyn Fn(ImportProgress) + Send + Sync + 'a;

const DUPLICATE_WARNING: &str = "Note already exists and overwrite is disabled";
const TP_NOT_CONFIGURED_WARNING: &str = "TP provided but not configured for this subject";

/// How a single spreadsheet row ended.
#[derive(Debug)]
pub(crate) enum RowOutcome {
    /// The grade was created or updated (or would be, in a dry run).
    Written {
        detail: ProcessedRow,
        grade: ImportedGrade,
        record: GradeRecord,
    },
    Skipped(ProcessedRow),
    NotFound(ProcessedRow),
    /// `attempted_write` is false when the row failed before reaching the store write.
    Failed {
        detail: ProcessedRow,
        attempted_write: bool,
    },
}

/// Running totals of an import, fed one [`RowOutcome`] at a time.
#[derive(Debug, Default)]
pub(crate) struct ImportLedger {
    processed: usize,
    successful: usize,
    failed: usize,
    skipped: usize,
    created: usize,
    updated: usize,
    not_found: usize,
    imported: Vec<ImportedGrade>,
    records: Vec<GradeRecord>,
    errors: Vec<String>,
    warnings: Vec<String>,
    details: Vec<ProcessedRow>,
}

impl ImportLedger {
    pub(crate) fn record(mut self, outcome: RowOutcome) -> Self {
        match outcome {
            RowOutcome::Written {
                detail,
                grade,
                record,
            } => {
                self.processed += 1;
                self.successful += 1;
                if detail.status == RowStatus::Updated {
                    self.updated += 1;
                } else {
                    self.created += 1;
                }
                self.collect_warnings(&detail);
                self.imported.push(grade);
                self.records.push(record);
                self.details.push(detail);
            }
            RowOutcome::Skipped(detail) => {
                self.skipped += 1;
                self.collect_warnings(&detail);
                self.details.push(detail);
            }
            RowOutcome::NotFound(detail) => {
                self.not_found += 1;
                self.failed += 1;
                self.collect_errors(&detail);
                self.details.push(detail);
            }
            RowOutcome::Failed {
                detail,
                attempted_write,
            } => {
                if attempted_write {
                    self.processed += 1;
                }
                self.failed += 1;
                self.collect_errors(&detail);
                self.collect_warnings(&detail);
                self.details.push(detail);
            }
        }
        self
    }

    fn collect_errors(&mut self, detail: &ProcessedRow) {
        if !detail.errors.is_empty() {
            self.errors
                .push(format!("Row {}: {}", detail.row_number, detail.errors.join(", ")));
        }
    }

    fn collect_warnings(&mut self, detail: &ProcessedRow) {
        self.warnings.extend(
            detail
                .warnings
                .iter()
                .map(|w| format!("Row {}: {w}", detail.row_number)),
        );
    }

    /// Builds the report. Statistics cover the successfully imported rows only
    /// and weigh TP by the subject configuration; `has_tp_component` reports
    /// whether the file itself carried a TP column.
    pub(crate) fn into_report(
        self,
        parsed: ParsedSpreadsheet,
        config_has_tp: bool,
        validate_only: bool,
    ) -> ImportReport {
        let statistics =
            GradeStatistics::compute(self.successful, self.records.iter(), config_has_tp);
        let has_tp_column = parsed.has_tp_column;

        let mut errors = parsed.errors;
        errors.extend(self.errors);
        let mut warnings = parsed.warnings;
        warnings.extend(self.warnings);

        ImportReport {
            total_rows: parsed.total_rows,
            valid_rows: parsed.valid_rows,
            processed_rows: self.processed,
            successful_imports: self.successful,
            failed_imports: self.failed,
            skipped_duplicates: self.skipped,
            updated_notes: self.updated,
            created_notes: self.created,
            students_not_found: self.not_found,
            has_tp_component: has_tp_column,
            validate_only,
            statistics,
            imported_notes: self.imported,
            errors,
            warnings,
            processing_details: self.details,
        }
    }
}

/// Resolves rows against a class roster and writes the resulting grades.
pub(crate) struct Reconciler<'a> {
    roster: HashMap<String, &'a Student>,
    config: &'a GradeConfig,
    subject_id: SubjectId,
    teacher_id: TeacherId,
    overwrite_existing: bool,
    validate_only: bool,
    /// Records a dry run would have written, so later rows see them as stored.
    staged: HashMap<StudentId, GradeRecord>,
}

impl<'a> Reconciler<'a> {
    pub(crate) fn new(
        students: &'a [Student],
        config: &'a GradeConfig,
        teacher_id: TeacherId,
        request: &ImportRequest,
    ) -> Self {
        let roster = students
            .iter()
            .map(|s| (lookup_key(&s.student_number), s))
            .collect();

        Self {
            roster,
            config,
            subject_id: request.subject_id,
            teacher_id,
            overwrite_existing: request.overwrite_existing,
            validate_only: request.validate_only,
            staged: HashMap::new(),
        }
    }

    async fn existing_record<S: GradeStore>(
        &self,
        store: &S,
        student_id: StudentId,
    ) -> Result<Option<GradeRecord>, StoreError> {
        if let Some(record) = self.staged.get(&student_id) {
            return Ok(Some(record.clone()));
        }
        store
            .find_by_student_and_subject(student_id, self.subject_id)
            .await
    }

    pub(crate) async fn reconcile_row<S: GradeStore>(
        &mut self,
        store: &S,
        row: &SpreadsheetRow,
    ) -> RowOutcome {
        let mut detail = ProcessedRow::pending(row);

        let Some(student) = self.roster.get(&lookup_key(&row.student_number)).copied() else {
            detail.status = RowStatus::FailedNotFound;
            detail.errors.push(format!(
                "Student with number {} not found in class",
                row.student_number
            ));
            return RowOutcome::NotFound(detail);
        };
        detail.student_id = Some(student.id);
        detail.is_existing_student = true;

        let existing = match self.existing_record(store, student.id).await {
            Ok(existing) => existing,
            Err(e) => {
                detail
                    .errors
                    .push(format!("Failed to load existing note: {e}"));
                return RowOutcome::Failed {
                    detail,
                    attempted_write: false,
                };
            }
        };

        if existing.is_some() {
            detail.is_existing_note = true;
            if !self.overwrite_existing {
                detail.status = RowStatus::SkippedDuplicate;
                detail.warnings.push(DUPLICATE_WARNING.to_string());
                return RowOutcome::Skipped(detail);
            }
        }

        if !self.config.has_tp() && row.note_tp.is_some() {
            detail.warnings.push(TP_NOT_CONFIGURED_WARNING.to_string());
        }

        let candidate = match self.candidate(student, existing.as_ref(), row) {
            Ok(record) => record.with_final_grade(Some(self.config)),
            Err(e) => {
                detail.errors.push(e.to_string());
                return RowOutcome::Failed {
                    detail,
                    attempted_write: false,
                };
            }
        };

        let is_update = existing.is_some();
        let written = if self.validate_only {
            self.staged.insert(student.id, candidate.clone());
            Ok(candidate)
        } else if is_update {
            store.update(&candidate).await
        } else {
            store.save(&candidate).await
        };

        let record = match written {
            Ok(record) => record,
            Err(e) => {
                warn!(row = row.row_number, error = %e, "Import row write failed");
                detail.errors.push(format!("Failed to save note: {e}"));
                return RowOutcome::Failed {
                    detail,
                    attempted_write: true,
                };
            }
        };

        detail.status = if is_update {
            RowStatus::Updated
        } else {
            RowStatus::Created
        };
        detail.final_grade = record.note_finale();
        detail.is_passed = Some(record.is_passed());
        detail.grade_letter = Some(record.grade_letter());

        let grade = ImportedGrade {
            id: record.id(),
            student_id: student.id,
            student_full_name: student.full_name(),
            student_number: student.student_number.clone(),
            note_cc: record.note_cc(),
            note_tp: record.note_tp(),
            note_dv: record.note_dv(),
            note_finale: record.note_finale(),
            grade_letter: record.grade_letter(),
            is_passed: record.is_passed(),
            is_updated: is_update,
            is_created: !is_update,
        };

        RowOutcome::Written {
            detail,
            grade,
            record,
        }
    }

    /// The record a row asks for. Over an existing record, blank cells keep
    /// the stored value; a new record leaves them empty.
    fn candidate(
        &self,
        student: &Student,
        existing: Option<&GradeRecord>,
        row: &SpreadsheetRow,
    ) -> Result<GradeRecord, gradebook_models::ValidationError> {
        match existing {
            Some(record) => {
                let keep_blank = |value: Option<f64>| value.map_or(Patch::Unchanged, Patch::Set);
                record.with_updated_components(&ComponentPatch::new(
                    keep_blank(row.note_cc),
                    keep_blank(row.note_tp),
                    keep_blank(row.note_dv),
                ))
            }
            None => GradeRecord::create(
                student.id,
                self.subject_id,
                self.teacher_id,
                ComponentScores::new(row.note_cc, row.note_tp, row.note_dv),
            ),
        }
    }
}

fn lookup_key(student_number: &str) -> String {
    student_number.trim().to_lowercase()
}

fn emit(on_progress: Option<&ProgressCallback<'_>>, update: ImportProgress) {
    debug!(
        stage = ?update.stage,
        progress = update.progress,
        "{}",
        update.message
    );
    if let Some(callback) = on_progress {
        callback(update);
    }
}

impl<S, R> GradeService<S, R>
where
    S: GradeStore,
    R: SpreadsheetReader,
{
    /// Imports grades for one (subject, class) from an uploaded spreadsheet.
    ///
    /// Rows are handled strictly in file order, one store call at a time.
    /// With `validate_only` the whole matching runs but nothing is written.
    pub async fn import_from_spreadsheet(
        &self,
        bytes: &[u8],
        request: ImportRequest,
        teacher_id: TeacherId,
        on_progress: Option<&ProgressCallback<'_>>,
    ) -> Result<ImportReport, AppError> {
        let span = business_span!(
            "grades.import",
            subject_id = %request.subject_id,
            class_id = %request.class_id,
            validate_only = request.validate_only,
            bytes = bytes.len()
        );

        async move {
            let subject_id = request.subject_id.validated().map_err(validation_error)?;
            let class_id = request.class_id.validated().map_err(validation_error)?;
            let teacher_id = teacher_id.validated().map_err(validation_error)?;

            if bytes.len() > self.import_config.max_file_size {
                record_error("file too large");
                return Err(AppError::payload_too_large(anyhow!(
                    "File too large: {} bytes (maximum {})",
                    bytes.len(),
                    self.import_config.max_file_size
                )));
            }

            emit(
                on_progress,
                ImportProgress::new(ImportStage::Starting, 5, "Starting import process..."),
            );

            self.require_subject(subject_id).await?;
            self.require_class(class_id).await?;
            let students = self.store.find_students_by_class(class_id).await?;
            if students.is_empty() {
                return Err(AppError::bad_request(anyhow!(
                    "No students found in the specified class"
                )));
            }

            emit(
                on_progress,
                ImportProgress::new(ImportStage::Validating, 10, "Validating spreadsheet..."),
            );

            let parsed = self.reader.parse(bytes).map_err(|e| {
                record_error(&e.to_string());
                AppError::bad_request(anyhow!("Failed to parse spreadsheet: {e}"))
            })?;
            if parsed.valid_rows == 0 {
                let reason = if parsed.errors.is_empty() {
                    "no data rows found".to_string()
                } else {
                    format!("no valid rows ({})", parsed.errors.join("; "))
                };
                record_error(&reason);
                return Err(AppError::bad_request(anyhow!(
                    "Failed to parse spreadsheet: {reason}"
                )));
            }

            emit(
                on_progress,
                ImportProgress::new(ImportStage::Parsing, 40, "Processing student data..."),
            );

            let config = self
                .store
                .find_config_by_subject(subject_id)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(anyhow!("Note configuration not found for this subject"))
                })?;

            let mut reconciler = Reconciler::new(&students, &config, teacher_id, &request);
            let total = parsed.rows.len();
            let interval = self.import_config.progress_interval.max(1);

            let mut ledger = ImportLedger::default();
            for (index, row) in parsed.rows.iter().enumerate() {
                let current = index + 1;
                if current % interval == 0 || current == total {
                    emit(on_progress, ImportProgress::processing(current, total));
                }
                ledger = ledger.record(reconciler.reconcile_row(&self.store, row).await);
            }

            emit(
                on_progress,
                ImportProgress::new(ImportStage::Finalizing, 90, "Finalizing import..."),
            );

            let report = ledger.into_report(parsed, config.has_tp(), request.validate_only);

            audit_event!(
                "grade.import",
                "grade",
                subject_id = %subject_id,
                class_id = %class_id,
                teacher_id = %teacher_id,
                validate_only = request.validate_only,
                created = report.created_notes,
                updated = report.updated_notes,
                failed = report.failed_imports,
                skipped = report.skipped_duplicates
            );
            record_success();

            emit(
                on_progress,
                ImportProgress::new(ImportStage::Completed, 100, "Import completed"),
            );

            Ok::<_, AppError>(report)
        }
        .instrument(span)
        .await
    }
}
