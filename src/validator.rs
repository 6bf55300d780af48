//! JSON body extractor that runs `validator` rules before the handler.

use anyhow::anyhow;
use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use gradebook_core::AppError;

/// `field is invalid` for rules without a custom message, joined with `, `.
fn format_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"))
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}

fn rejection_error(rejection: &JsonRejection) -> AppError {
    if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
        return AppError::bad_request(anyhow!(
            "Missing 'Content-Type: application/json' header"
        ));
    }

    let text = rejection.body_text();
    if let Some(field) = text
        .split("missing field `")
        .nth(1)
        .and_then(|rest| rest.split('`').next())
    {
        return AppError::bad_request(anyhow!("{field} is required"));
    }
    if text.contains("invalid type") {
        return AppError::bad_request(anyhow!("Invalid field type in request"));
    }

    AppError::bad_request(anyhow!("Invalid request body"))
}

/// Rejects malformed bodies with 400 and rule violations with 422.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| rejection_error(&rejection))?;

        value
            .validate()
            .map_err(|errors| AppError::unprocessable(anyhow!("{}", format_errors(&errors))))?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use gradebook_models::SaveGradeConfigRequest;

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("PUT")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let ValidatedJson(config) = ValidatedJson::<SaveGradeConfigRequest>::from_request(
            json_request(r#"{"pct_cc":40,"pct_tp":0,"pct_dv":60}"#),
            &(),
        )
        .await
        .unwrap();

        assert_eq!(config.pct_dv, 60.0);
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let err = ValidatedJson::<SaveGradeConfigRequest>::from_request(
            json_request(r#"{"pct_cc":40,"pct_tp":0}"#),
            &(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "pct_dv is required");
    }

    #[tokio::test]
    async fn test_rule_violation_is_unprocessable() {
        let err = ValidatedJson::<SaveGradeConfigRequest>::from_request(
            json_request(r#"{"pct_cc":140,"pct_tp":0,"pct_dv":60}"#),
            &(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message(), "pct_cc is invalid");
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let req = Request::builder()
            .method("PUT")
            .uri("/")
            .body(Body::from("{}"))
            .unwrap();
        let err = ValidatedJson::<SaveGradeConfigRequest>::from_request(req, &())
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message().contains("Content-Type"));
    }
}
