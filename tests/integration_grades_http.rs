//! Router-level tests for requests that are answered before the store is hit.
//!
//! The pool is created lazily against an address that is never dialled, so
//! every request here must be rejected by an extractor or by id validation.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use gradebook::router::init_router;
use gradebook::state::AppState;
use gradebook_auth::create_access_token;
use gradebook_config::{CorsConfig, ImportConfig, JwtConfig};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

fn app() -> Router {
    let db = PgPoolOptions::new()
        .connect_lazy("postgres://gradebook@localhost:1/unused")
        .unwrap();

    init_router(AppState {
        db,
        jwt_config: JwtConfig::default(),
        cors_config: CorsConfig::default(),
        import_config: ImportConfig::default(),
    })
}

fn bearer() -> String {
    let token = create_access_token(7, "teacher@school.test", &JwtConfig::default()).unwrap();
    format!("Bearer {token}")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_authorization_header() {
    let request = Request::builder()
        .uri("/api/grades/subjects")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Missing authorization header");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let request = Request::builder()
        .uri("/api/grades/subjects")
        .header(header::AUTHORIZATION, "Basic dGVhY2hlcjpwdw==")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await["error"],
        "Invalid authorization header format"
    );
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let forged = create_access_token(
        7,
        "teacher@school.test",
        &JwtConfig {
            secret: "someone-else".to_string(),
            access_token_expiry: 3600,
        },
    )
    .unwrap();

    let request = Request::builder()
        .uri("/api/grades/subjects")
        .header(header::AUTHORIZATION, format!("Bearer {forged}"))
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_config_percentages_are_validated_before_the_handler() {
    let request = Request::builder()
        .method("PUT")
        .uri("/api/grades/config/10")
        .header(header::AUTHORIZATION, bearer())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "pct_cc": 140.0, "pct_tp": 0.0, "pct_dv": 60.0 }).to_string(),
        ))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"], "pct_cc is invalid");
}

#[tokio::test]
async fn test_config_missing_field_is_bad_request() {
    let request = Request::builder()
        .method("PUT")
        .uri("/api/grades/config/10")
        .header(header::AUTHORIZATION, bearer())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "pct_cc": 40.0, "pct_tp": 0.0 }).to_string()))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "pct_dv is required");
}

#[tokio::test]
async fn test_update_with_invalid_student_id() {
    let request = Request::builder()
        .method("PUT")
        .uri("/api/grades")
        .header(header::AUTHORIZATION, bearer())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "student_id": 0, "subject_id": 10, "note_cc": 12.0 }).to_string(),
        ))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Valid student ID is required");
}

#[tokio::test]
async fn test_import_without_file() {
    let boundary = "gradebook-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"subject_id\"\r\n\r\n\
         10\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"class_id\"\r\n\r\n\
         1\r\n\
         --{boundary}--\r\n"
    );

    let request = Request::builder()
        .method("POST")
        .uri("/api/grades/import")
        .header(header::AUTHORIZATION, bearer())
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No file provided");
}

#[tokio::test]
async fn test_responses_carry_a_request_id() {
    let request = Request::builder()
        .uri("/api/grades/subjects")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    let id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_openapi_document_lists_grade_routes() {
    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let doc = json_body(response).await;
    let paths = doc["paths"].as_object().unwrap();
    for path in [
        "/api/grades",
        "/api/grades/batch",
        "/api/grades/import",
        "/api/grades/template",
        "/api/grades/students",
        "/api/grades/subjects",
        "/api/grades/config/{subject_id}",
        "/api/grades/students/{student_id}/subjects/{subject_id}",
    ] {
        assert!(paths.contains_key(path), "missing {path}");
    }
}
