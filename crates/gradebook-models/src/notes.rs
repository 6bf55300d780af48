//! Request and response DTOs for grade management.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::component::DominantComponent;
use crate::grade_config::GradeConfig;
use crate::grade_record::{GradeLetter, GradeRecord};
use crate::ids::{ClassId, GradeId, StudentId, SubjectId, TeacherId};
use crate::patch::{ComponentPatch, Patch};
use crate::roster::{Student, Subject};
use crate::statistics::GradeStatistics;

/// Update of one student's grade for one subject.
///
/// Omitted notes are left as they are; `null` clears a note.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateGradeRequest {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub note_cc: Patch<f64>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub note_tp: Patch<f64>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub note_dv: Patch<f64>,
}

impl UpdateGradeRequest {
    pub fn patch(&self) -> ComponentPatch {
        ComponentPatch::new(self.note_cc, self.note_tp, self.note_dv)
    }
}

/// One entry of a batch update; the subject comes from the enclosing request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BatchGradeItem {
    pub student_id: StudentId,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub note_cc: Patch<f64>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub note_tp: Patch<f64>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub note_dv: Patch<f64>,
}

impl BatchGradeItem {
    pub fn patch(&self) -> ComponentPatch {
        ComponentPatch::new(self.note_cc, self.note_tp, self.note_dv)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BatchUpdateGradesRequest {
    pub subject_id: SubjectId,
    pub notes: Vec<BatchGradeItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchUpdateResult {
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Display view of a grade record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GradeView {
    pub id: Option<GradeId>,
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub note_cc: Option<f64>,
    pub note_tp: Option<f64>,
    pub note_dv: Option<f64>,
    pub note_finale: Option<f64>,
    pub grade_letter: GradeLetter,
    pub is_passed: bool,
    pub completion_percentage: u8,
}

impl GradeView {
    pub fn from_record(record: &GradeRecord, has_tp: bool) -> Self {
        Self {
            id: record.id(),
            student_id: record.student_id(),
            subject_id: record.subject_id(),
            teacher_id: record.teacher_id(),
            note_cc: record.note_cc(),
            note_tp: record.note_tp(),
            note_dv: record.note_dv(),
            note_finale: record.note_finale(),
            grade_letter: record.grade_letter(),
            is_passed: record.is_passed(),
            completion_percentage: record.completion_percentage(has_tp),
        }
    }
}

/// A roster student joined with their grade, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudentGradeView {
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub student_number: String,
    pub note: Option<GradeView>,
}

impl StudentGradeView {
    pub fn new(student: &Student, note: Option<GradeView>) -> Self {
        Self {
            student_id: student.id,
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            email: student.email.clone(),
            student_number: student.student_number.clone(),
            note,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GradeConfigView {
    pub subject_id: SubjectId,
    pub pct_cc: f64,
    pub pct_tp: f64,
    pub pct_dv: f64,
    pub has_tp_component: bool,
    pub dominant_component: DominantComponent,
}

impl From<&GradeConfig> for GradeConfigView {
    fn from(config: &GradeConfig) -> Self {
        Self {
            subject_id: config.subject_id(),
            pct_cc: config.pct_cc(),
            pct_tp: config.pct_tp(),
            pct_dv: config.pct_dv(),
            has_tp_component: config.has_tp(),
            dominant_component: config.dominant_component(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubjectWithConfig {
    pub id: SubjectId,
    pub name: String,
    pub description: Option<String>,
    pub coefficient: f64,
    pub grade_config: Option<GradeConfigView>,
}

impl SubjectWithConfig {
    pub fn new(subject: &Subject, config: Option<&GradeConfig>) -> Self {
        Self {
            id: subject.id,
            name: subject.name.clone(),
            description: subject.description.clone(),
            coefficient: subject.coefficient,
            grade_config: config.map(GradeConfigView::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudentNotesResponse {
    pub subject: SubjectWithConfig,
    pub class_name: String,
    pub students: Vec<StudentGradeView>,
    pub statistics: GradeStatistics,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StudentNotesQuery {
    pub subject_id: SubjectId,
    pub class_id: ClassId,
}

/// A subject/class pair the teacher grades, with its progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TeacherSubjectView {
    pub subject_id: SubjectId,
    pub class_id: ClassId,
    pub subject_name: String,
    pub class_name: String,
    pub student_count: i64,
    pub has_notes: bool,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SaveGradeConfigRequest {
    #[validate(range(min = 0.0, max = 100.0))]
    pub pct_cc: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub pct_tp: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub pct_dv: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
