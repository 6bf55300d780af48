use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use gradebook_auth::{Claims, verify_token};
use gradebook_core::AppError;
use gradebook_models::ids::TeacherId;

use crate::state::AppState;

/// Extractor that validates the bearer token and yields the teacher's claims.
#[derive(Debug, Clone)]
pub struct AuthTeacher(pub Claims);

impl AuthTeacher {
    /// The teacher id carried in the `sub` claim.
    pub fn teacher_id(&self) -> Result<TeacherId, AppError> {
        self.0
            .teacher_id()
            .map(TeacherId::from_raw)
            .ok_or_else(|| AppError::unauthorized("Invalid teacher ID in token"))
    }
}

impl FromRequestParts<AppState> for AuthTeacher {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token, &state.jwt_config)?;

        let teacher = AuthTeacher(claims);
        teacher.teacher_id()?;

        Ok(teacher)
    }
}
