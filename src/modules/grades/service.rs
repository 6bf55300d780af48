use std::collections::HashMap;

use anyhow::anyhow;
use tracing::{Instrument, info, instrument, warn};

use gradebook_config::ImportConfig;
use gradebook_core::AppError;
use gradebook_models::ids::{ClassId, StudentId, SubjectId, TeacherId};
use gradebook_models::{
    BatchUpdateGradesRequest, BatchUpdateResult, ComponentPatch, ComponentScores, GradeConfig,
    GradeConfigView, GradeRecord, GradeStatistics, GradeView, MessageResponse, SchoolClass,
    StudentGradeView, StudentNotesResponse, Subject, SubjectWithConfig, TeacherSubjectView,
    UpdateGradeRequest, ValidationError,
};

use super::store::GradeStore;
use crate::modules::spreadsheet::SpreadsheetReader;
use crate::utils::tracing::{ErrorExt, record_error, record_success};
use crate::{audit_event, business_span};

/// Maps a domain validation failure to its HTTP category.
///
/// Missing ids and empty batches are malformed requests (400); everything
/// else is a well-formed request breaking a grading rule (422).
pub fn validation_error(err: ValidationError) -> AppError {
    match err {
        ValidationError::InvalidId { .. } | ValidationError::EmptyUpdate => {
            AppError::bad_request(err)
        }
        _ => AppError::unprocessable(err),
    }
}

/// Grade management over a [`GradeStore`] and a [`SpreadsheetReader`].
///
/// Holds no state between calls; construct one per request.
pub struct GradeService<S, R> {
    pub(super) store: S,
    pub(super) reader: R,
    pub(super) import_config: ImportConfig,
}

impl<S, R> GradeService<S, R>
where
    S: GradeStore,
    R: SpreadsheetReader,
{
    pub fn new(store: S, reader: R, import_config: ImportConfig) -> Self {
        Self {
            store,
            reader,
            import_config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates or partially updates the grade of one student for one subject.
    ///
    /// Nothing is written unless every id and every supplied score is valid
    /// and both the student and the subject exist.
    #[instrument(skip(self, request), fields(student_id = %request.student_id, subject_id = %request.subject_id))]
    pub async fn update_single_grade(
        &self,
        request: UpdateGradeRequest,
        teacher_id: TeacherId,
    ) -> Result<GradeView, AppError> {
        let student_id = request.student_id.validated().map_err(validation_error)?;
        let subject_id = request.subject_id.validated().map_err(validation_error)?;
        let teacher_id = teacher_id.validated().map_err(validation_error)?;

        let patch = request.patch();
        patch.validate().map_err(validation_error)?;

        self.require_student(student_id).await?;
        self.require_subject(subject_id).await?;

        let config = self.store.find_config_by_subject(subject_id).await?;
        let existing = self
            .store
            .find_by_student_and_subject(student_id, subject_id)
            .await?;

        let record = merge(existing.as_ref(), student_id, subject_id, teacher_id, &patch)
            .map_err(validation_error)?
            .with_final_grade(config.as_ref());

        let (saved, action) = match existing {
            Some(_) => (self.store.update(&record).await?, "grade.update"),
            None => (self.store.save(&record).await?, "grade.create"),
        };

        audit_event!(
            action,
            "grade",
            student_id = %student_id,
            subject_id = %subject_id,
            teacher_id = %teacher_id,
            note_finale = ?saved.note_finale()
        );

        Ok(GradeView::from_record(&saved, has_tp(config.as_ref())))
    }

    /// Applies many updates for one subject, tolerating per-student failures.
    ///
    /// Only a missing subject, an invalid subject or teacher id, or an empty
    /// list fails the whole call. Every other failure is reported in the
    /// result and the remaining students are still written.
    pub async fn batch_update_grades(
        &self,
        request: BatchUpdateGradesRequest,
        teacher_id: TeacherId,
    ) -> Result<BatchUpdateResult, AppError> {
        let span = business_span!(
            "grades.batch_update",
            subject_id = %request.subject_id,
            count = request.notes.len()
        );

        async move {
            let subject_id = request.subject_id.validated().map_err(validation_error)?;
            let teacher_id = teacher_id.validated().map_err(validation_error)?;
            if request.notes.is_empty() {
                return Err(validation_error(ValidationError::EmptyUpdate));
            }

            self.require_subject(subject_id).await?;
            let config = self.store.find_config_by_subject(subject_id).await?;

            let mut result = BatchUpdateResult {
                successful: 0,
                failed: 0,
                errors: Vec::new(),
            };
            let mut staged = Vec::with_capacity(request.notes.len());

            for item in &request.notes {
                match self
                    .stage_batch_item(item.student_id, subject_id, teacher_id, &item.patch())
                    .await
                {
                    Ok(record) => staged.push(record.with_final_grade(config.as_ref())),
                    Err(message) => {
                        result.failed += 1;
                        result
                            .errors
                            .push(format!("Student {}: {message}", item.student_id));
                    }
                }
            }

            let written = self.store.batch_update(&staged).await;
            for (record, outcome) in staged.iter().zip(written) {
                match outcome {
                    Ok(_) => result.successful += 1,
                    Err(e) => {
                        result.failed += 1;
                        result
                            .errors
                            .push(format!("Student {}: {e}", record.student_id()));
                    }
                }
            }

            if result.failed > 0 {
                warn!(failed = result.failed, "Batch grade update partially failed");
                record_error(&format!("{} of the updates failed", result.failed));
            } else {
                record_success();
            }

            audit_event!(
                "grade.batch_update",
                "grade",
                subject_id = %subject_id,
                teacher_id = %teacher_id,
                successful = result.successful,
                failed = result.failed
            );

            Ok::<_, AppError>(result)
        }
        .instrument(span)
        .await
    }

    /// Validates one batch entry and merges it over the stored record.
    ///
    /// The error is the message recorded against the student.
    async fn stage_batch_item(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
        teacher_id: TeacherId,
        patch: &ComponentPatch,
    ) -> Result<GradeRecord, String> {
        let student_id = student_id.validated().map_err(|e| e.to_string())?;
        patch.validate().map_err(|e| e.to_string())?;

        match self.store.find_student_by_id(student_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return Err("Student not found".to_string()),
            Err(e) => return Err(e.to_string()),
        }

        let existing = self
            .store
            .find_by_student_and_subject(student_id, subject_id)
            .await
            .map_err(|e| e.to_string())?;

        merge(existing.as_ref(), student_id, subject_id, teacher_id, patch)
            .map_err(|e| e.to_string())
    }

    /// Every roster student of a class with their grade for a subject.
    ///
    /// A subject without grade configuration is reported as CC + DV with no
    /// final grades.
    #[instrument(skip(self))]
    pub async fn get_student_notes(
        &self,
        subject_id: SubjectId,
        class_id: ClassId,
    ) -> Result<StudentNotesResponse, AppError> {
        let subject_id = subject_id.validated().map_err(validation_error)?;
        let class_id = class_id.validated().map_err(validation_error)?;

        let subject = self.require_subject(subject_id).await?;
        let class = self.require_class(class_id).await?;
        let config = self.store.find_config_by_subject(subject_id).await?;
        let students = self.store.find_students_by_class(class_id).await?;
        let records = self
            .store
            .find_by_subject_and_class(subject_id, class_id)
            .await?;

        let has_tp = has_tp(config.as_ref());
        let mut by_student: HashMap<StudentId, GradeRecord> = records
            .into_iter()
            .map(|r| (r.student_id(), r))
            .collect();

        let mut roster_records = Vec::with_capacity(by_student.len());
        let views = students
            .iter()
            .map(|student| {
                let record = by_student.remove(&student.id);
                let view = record.as_ref().map(|r| GradeView::from_record(r, has_tp));
                roster_records.extend(record);
                StudentGradeView::new(student, view)
            })
            .collect::<Vec<_>>();

        let statistics = GradeStatistics::compute(students.len(), roster_records.iter(), has_tp);

        Ok(StudentNotesResponse {
            subject: SubjectWithConfig::new(&subject, config.as_ref()),
            class_name: class.name,
            students: views,
            statistics,
        })
    }

    /// The (subject, class) pairs a teacher grades, with their progress.
    #[instrument(skip(self))]
    pub async fn get_teacher_subjects(
        &self,
        teacher_id: TeacherId,
    ) -> Result<Vec<TeacherSubjectView>, AppError> {
        let teacher_id = teacher_id.validated().map_err(validation_error)?;
        let assignments = self.store.find_teacher_assignments(teacher_id).await?;

        let mut views = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let stats = self
                .store
                .get_statistics(assignment.subject_id, assignment.class_id)
                .await
                .log_error("Failed to load subject statistics")?;

            views.push(TeacherSubjectView {
                subject_id: assignment.subject_id,
                class_id: assignment.class_id,
                subject_name: assignment.subject_name,
                class_name: assignment.class_name,
                student_count: assignment.student_count,
                has_notes: stats.students_with_notes > 0,
                completion_rate: stats.completion_rate,
            });
        }

        views.sort_by(|a, b| {
            a.subject_name
                .cmp(&b.subject_name)
                .then_with(|| a.class_name.cmp(&b.class_name))
        });

        Ok(views)
    }

    /// Creates or replaces the weighting of a subject.
    #[instrument(skip(self))]
    pub async fn save_grade_config(
        &self,
        subject_id: SubjectId,
        pct_cc: f64,
        pct_tp: f64,
        pct_dv: f64,
    ) -> Result<GradeConfigView, AppError> {
        let subject_id = subject_id.validated().map_err(validation_error)?;
        let config =
            GradeConfig::create(subject_id, pct_cc, pct_tp, pct_dv).map_err(validation_error)?;

        self.require_subject(subject_id).await?;
        let saved = self.store.save_config(&config).await?;

        audit_event!(
            "grade_config.save",
            "grade_config",
            subject_id = %subject_id,
            pct_cc = saved.pct_cc(),
            pct_tp = saved.pct_tp(),
            pct_dv = saved.pct_dv()
        );

        Ok(GradeConfigView::from(&saved))
    }

    #[instrument(skip(self))]
    pub async fn delete_grade(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
    ) -> Result<MessageResponse, AppError> {
        let student_id = student_id.validated().map_err(validation_error)?;
        let subject_id = subject_id.validated().map_err(validation_error)?;

        if !self.store.delete(student_id, subject_id).await? {
            return Err(AppError::not_found(anyhow!("Note not found")));
        }

        audit_event!(
            "grade.delete",
            "grade",
            student_id = %student_id,
            subject_id = %subject_id
        );
        info!(student_id = %student_id, subject_id = %subject_id, "Grade deleted");

        Ok(MessageResponse {
            message: "Note deleted successfully".to_string(),
        })
    }

    pub(super) async fn require_student(&self, student_id: StudentId) -> Result<(), AppError> {
        self.store
            .find_student_by_id(student_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
    }

    pub(super) async fn require_subject(&self, subject_id: SubjectId) -> Result<Subject, AppError> {
        self.store
            .find_subject_by_id(subject_id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Subject not found")))
    }

    pub(super) async fn require_class(&self, class_id: ClassId) -> Result<SchoolClass, AppError> {
        self.store
            .find_class_by_id(class_id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Class not found")))
    }
}

/// Applies `patch` over the stored record, or over an empty one.
fn merge(
    existing: Option<&GradeRecord>,
    student_id: StudentId,
    subject_id: SubjectId,
    teacher_id: TeacherId,
    patch: &ComponentPatch,
) -> Result<GradeRecord, ValidationError> {
    match existing {
        Some(record) => record.with_updated_components(patch),
        None => GradeRecord::create(
            student_id,
            subject_id,
            teacher_id,
            ComponentScores::default(),
        )?
        .with_updated_components(patch),
    }
}

pub(super) fn has_tp(config: Option<&GradeConfig>) -> bool {
    config.is_some_and(GradeConfig::has_tp)
}
