use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use gradebook_models::{
    BatchGradeItem, BatchUpdateGradesRequest, BatchUpdateResult, Component, DominantComponent,
    GradeConfigView, GradeLetter, GradeStatistics, GradeView, ImportProgress, ImportReport,
    ImportStage, ImportedGrade, MessageResponse, ProcessedRow, RowStatus, SaveGradeConfigRequest,
    StudentGradeView, StudentNotesResponse, SubjectWithConfig, Template, TemplateStudentRow,
    TeacherSubjectView, UpdateGradeRequest,
};

use crate::modules::grades::controller::ImportUpload;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::grades::controller::update_grade,
        crate::modules::grades::controller::batch_update_grades,
        crate::modules::grades::controller::import_grades,
        crate::modules::grades::controller::get_template,
        crate::modules::grades::controller::get_student_notes,
        crate::modules::grades::controller::get_teacher_subjects,
        crate::modules::grades::controller::save_grade_config,
        crate::modules::grades::controller::delete_grade,
    ),
    components(
        schemas(
            Component,
            DominantComponent,
            GradeLetter,
            UpdateGradeRequest,
            BatchGradeItem,
            BatchUpdateGradesRequest,
            BatchUpdateResult,
            GradeView,
            StudentGradeView,
            GradeConfigView,
            SubjectWithConfig,
            GradeStatistics,
            StudentNotesResponse,
            TeacherSubjectView,
            SaveGradeConfigRequest,
            MessageResponse,
            ImportUpload,
            ImportReport,
            ImportedGrade,
            ProcessedRow,
            RowStatus,
            ImportStage,
            ImportProgress,
            Template,
            TemplateStudentRow,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Grades", description = "Grade entry, spreadsheet import and class overviews")
    ),
    info(
        title = "Gradebook API",
        version = "0.1.0",
        description = "Grade computation and bulk reconciliation for CC/TP/DV weighted subjects.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
