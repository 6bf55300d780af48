use anyhow::anyhow;
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use gradebook_core::AppError;
use gradebook_models::ids::{ClassId, StudentId, SubjectId};
use gradebook_models::{
    BatchUpdateGradesRequest, BatchUpdateResult, GradeConfigView, GradeView, ImportReport,
    ImportRequest, MessageResponse, SaveGradeConfigRequest, StudentNotesQuery,
    StudentNotesResponse, Template, TemplateRequest, TeacherSubjectView, UpdateGradeRequest,
};

use crate::middleware::auth::AuthTeacher;
use crate::modules::grades::template::render_csv;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    put,
    path = "/api/grades",
    request_body = UpdateGradeRequest,
    responses(
        (status = 200, description = "Grade created or updated", body = GradeView),
        (status = 400, description = "Missing or invalid ID"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Student or subject not found"),
        (status = 422, description = "Note outside [0, 20]")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_grade(
    State(state): State<AppState>,
    teacher: AuthTeacher,
    Json(request): Json<UpdateGradeRequest>,
) -> Result<Json<GradeView>, AppError> {
    let teacher_id = teacher.teacher_id()?;
    let grade = state
        .grade_service()
        .update_single_grade(request, teacher_id)
        .await?;

    Ok(Json(grade))
}

#[utoipa::path(
    post,
    path = "/api/grades/batch",
    request_body = BatchUpdateGradesRequest,
    responses(
        (status = 200, description = "Per-student outcome counts", body = BatchUpdateResult),
        (status = 400, description = "Invalid subject ID or empty batch"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subject not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, request), fields(count = request.notes.len()))]
pub async fn batch_update_grades(
    State(state): State<AppState>,
    teacher: AuthTeacher,
    Json(request): Json<BatchUpdateGradesRequest>,
) -> Result<Json<BatchUpdateResult>, AppError> {
    let teacher_id = teacher.teacher_id()?;
    let result = state
        .grade_service()
        .batch_update_grades(request, teacher_id)
        .await?;

    Ok(Json(result))
}

/// Multipart body of an import upload.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ImportUpload {
    /// `.xlsx`, `.xls` or `.csv` file
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    subject_id: i64,
    class_id: i64,
    overwrite_existing: Option<bool>,
    validate_only: Option<bool>,
}

#[utoipa::path(
    post,
    path = "/api/grades/import",
    request_body(content = ImportUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Import report", body = ImportReport),
        (status = 400, description = "Missing file, invalid IDs, empty class or unreadable spreadsheet"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subject, class or grade configuration not found"),
        (status = 413, description = "File too large")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, multipart))]
pub async fn import_grades(
    State(state): State<AppState>,
    teacher: AuthTeacher,
    multipart: Multipart,
) -> Result<Json<ImportReport>, AppError> {
    let teacher_id = teacher.teacher_id()?;
    let (bytes, request) = read_import_form(multipart).await?;

    let report = state
        .grade_service()
        .import_from_spreadsheet(&bytes, request, teacher_id, None)
        .await?;

    Ok(Json(report))
}

async fn read_import_form(mut multipart: Multipart) -> Result<(Vec<u8>, ImportRequest), AppError> {
    let mut file: Option<Vec<u8>> = None;
    let mut subject_id: Option<SubjectId> = None;
    let mut class_id: Option<ClassId> = None;
    let mut overwrite_existing = false;
    let mut validate_only = false;

    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        AppError::new(e.status(), anyhow!("Failed to read upload: {}", e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                file = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
            }
            "subject_id" => {
                let text = field.text().await.map_err(multipart_error)?;
                subject_id = text.parse().ok();
            }
            "class_id" => {
                let text = field.text().await.map_err(multipart_error)?;
                class_id = text.parse().ok();
            }
            "overwrite_existing" => {
                overwrite_existing = parse_flag(&field.text().await.map_err(multipart_error)?);
            }
            "validate_only" => {
                validate_only = parse_flag(&field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let file = file
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| AppError::bad_request(anyhow!("No file provided")))?;
    let subject_id =
        subject_id.ok_or_else(|| AppError::bad_request(anyhow!("Valid subject ID is required")))?;
    let class_id =
        class_id.ok_or_else(|| AppError::bad_request(anyhow!("Valid class ID is required")))?;

    Ok((
        file,
        ImportRequest {
            subject_id,
            class_id,
            overwrite_existing,
            validate_only,
        },
    ))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TemplateFormat {
    /// `json` (default) or `csv`
    pub format: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/grades/template",
    params(TemplateRequest, TemplateFormat),
    responses(
        (status = 200, description = "Import template, as JSON or as a CSV file", body = Template),
        (status = 400, description = "Invalid IDs or unknown format"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subject, class or grade configuration not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_template(
    State(state): State<AppState>,
    _teacher: AuthTeacher,
    Query(request): Query<TemplateRequest>,
    Query(format): Query<TemplateFormat>,
) -> Result<Response, AppError> {
    let template = state.grade_service().generate_template(request).await?;

    match format.format.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("json") => Ok(Json(template).into_response()),
        Some("csv") => {
            let body = render_csv(&template).map_err(AppError::internal)?;
            let filename = template.filename.replace(".xlsx", ".csv");

            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                body,
            )
                .into_response())
        }
        Some(other) => Err(AppError::bad_request(anyhow!(
            "Unsupported template format '{other}'"
        ))),
    }
}

#[utoipa::path(
    get,
    path = "/api/grades/students",
    params(StudentNotesQuery),
    responses(
        (status = 200, description = "Roster with grades and statistics", body = StudentNotesResponse),
        (status = 400, description = "Invalid IDs"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subject or class not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student_notes(
    State(state): State<AppState>,
    _teacher: AuthTeacher,
    Query(query): Query<StudentNotesQuery>,
) -> Result<Json<StudentNotesResponse>, AppError> {
    let notes = state
        .grade_service()
        .get_student_notes(query.subject_id, query.class_id)
        .await?;

    Ok(Json(notes))
}

#[utoipa::path(
    get,
    path = "/api/grades/subjects",
    responses(
        (status = 200, description = "Subjects and classes taught by the caller", body = Vec<TeacherSubjectView>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_teacher_subjects(
    State(state): State<AppState>,
    teacher: AuthTeacher,
) -> Result<Json<Vec<TeacherSubjectView>>, AppError> {
    let teacher_id = teacher.teacher_id()?;
    let subjects = state.grade_service().get_teacher_subjects(teacher_id).await?;

    Ok(Json(subjects))
}

#[utoipa::path(
    put,
    path = "/api/grades/config/{subject_id}",
    params(
        ("subject_id" = i64, Path, description = "Subject ID")
    ),
    request_body = SaveGradeConfigRequest,
    responses(
        (status = 200, description = "Configuration saved", body = GradeConfigView),
        (status = 400, description = "Invalid subject ID"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subject not found"),
        (status = 422, description = "Percentages out of range or not summing to 100")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn save_grade_config(
    State(state): State<AppState>,
    _teacher: AuthTeacher,
    Path(subject_id): Path<i64>,
    ValidatedJson(request): ValidatedJson<SaveGradeConfigRequest>,
) -> Result<Json<GradeConfigView>, AppError> {
    let config = state
        .grade_service()
        .save_grade_config(
            SubjectId::from_raw(subject_id),
            request.pct_cc,
            request.pct_tp,
            request.pct_dv,
        )
        .await?;

    Ok(Json(config))
}

#[utoipa::path(
    delete,
    path = "/api/grades/students/{student_id}/subjects/{subject_id}",
    params(
        ("student_id" = i64, Path, description = "Student ID"),
        ("subject_id" = i64, Path, description = "Subject ID")
    ),
    responses(
        (status = 200, description = "Grade deleted", body = MessageResponse),
        (status = 400, description = "Invalid IDs"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Grade not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_grade(
    State(state): State<AppState>,
    _teacher: AuthTeacher,
    Path((student_id, subject_id)): Path<(i64, i64)>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let message = state
        .grade_service()
        .delete_grade(StudentId::from_raw(student_id), SubjectId::from_raw(subject_id))
        .await?;

    Ok((StatusCode::OK, Json(message)))
}
