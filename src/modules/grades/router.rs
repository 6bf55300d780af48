use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

use gradebook_config::ImportConfig;

use crate::state::AppState;

use super::controller::{
    batch_update_grades, delete_grade, get_student_notes, get_teacher_subjects, get_template,
    import_grades, save_grade_config, update_grade,
};

/// Room for the multipart boundaries and the text fields around the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn init_grades_router(import_config: &ImportConfig) -> Router<AppState> {
    Router::new()
        .route("/", put(update_grade))
        .route("/batch", post(batch_update_grades))
        .route(
            "/import",
            post(import_grades).layer(DefaultBodyLimit::max(
                import_config.max_file_size + MULTIPART_OVERHEAD,
            )),
        )
        .route("/template", get(get_template))
        .route("/students", get(get_student_notes))
        .route("/subjects", get(get_teacher_subjects))
        .route("/config/{subject_id}", put(save_grade_config))
        .route(
            "/students/{student_id}/subjects/{subject_id}",
            delete(delete_grade),
        )
}
