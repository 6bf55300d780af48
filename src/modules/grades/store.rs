//! The persistence port the grade services are written against.

use std::future::Future;

use thiserror::Error;

use gradebook_models::ids::{ClassId, StudentId, SubjectId, TeacherId};
use gradebook_models::{
    GradeConfig, GradeRecord, SchoolClass, Student, Subject, SubjectClassStatistics,
    TeacherAssignment, ValidationError,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row no longer satisfies the domain rules.
    #[error("Invalid stored data: {0}")]
    Corrupt(#[from] ValidationError),

    #[error("{0}")]
    Rejected(String),
}

/// Storage of grades, grade configs and the roster.
///
/// Every call is atomic on its own; nothing spans several calls. Callers
/// that write many records must expect some writes to fail and others to
/// succeed.
pub trait GradeStore: Send + Sync {
    fn find_by_student_and_subject(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
    ) -> impl Future<Output = Result<Option<GradeRecord>, StoreError>> + Send;

    fn find_by_subject_and_class(
        &self,
        subject_id: SubjectId,
        class_id: ClassId,
    ) -> impl Future<Output = Result<Vec<GradeRecord>, StoreError>> + Send;

    /// Inserts a new record and returns it with its id.
    fn save(
        &self,
        record: &GradeRecord,
    ) -> impl Future<Output = Result<GradeRecord, StoreError>> + Send;

    /// Overwrites the scores of an existing (student, subject) record.
    fn update(
        &self,
        record: &GradeRecord,
    ) -> impl Future<Output = Result<GradeRecord, StoreError>> + Send;

    /// Upserts records one by one, returning one result per input, in order.
    fn batch_update(
        &self,
        records: &[GradeRecord],
    ) -> impl Future<Output = Vec<Result<GradeRecord, StoreError>>> + Send;

    /// Returns `false` when there was nothing to delete.
    fn delete(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn find_config_by_subject(
        &self,
        subject_id: SubjectId,
    ) -> impl Future<Output = Result<Option<GradeConfig>, StoreError>> + Send;

    fn save_config(
        &self,
        config: &GradeConfig,
    ) -> impl Future<Output = Result<GradeConfig, StoreError>> + Send;

    fn find_students_by_class(
        &self,
        class_id: ClassId,
    ) -> impl Future<Output = Result<Vec<Student>, StoreError>> + Send;

    fn find_student_by_id(
        &self,
        student_id: StudentId,
    ) -> impl Future<Output = Result<Option<Student>, StoreError>> + Send;

    fn find_subject_by_id(
        &self,
        subject_id: SubjectId,
    ) -> impl Future<Output = Result<Option<Subject>, StoreError>> + Send;

    fn find_class_by_id(
        &self,
        class_id: ClassId,
    ) -> impl Future<Output = Result<Option<SchoolClass>, StoreError>> + Send;

    fn get_statistics(
        &self,
        subject_id: SubjectId,
        class_id: ClassId,
    ) -> impl Future<Output = Result<SubjectClassStatistics, StoreError>> + Send;

    fn find_teacher_assignments(
        &self,
        teacher_id: TeacherId,
    ) -> impl Future<Output = Result<Vec<TeacherAssignment>, StoreError>> + Send;
}
