//! JWT utilities for teacher authentication.
//!
//! # Example
//!
//! ```ignore
//! use gradebook_auth::{create_access_token, verify_token};
//! use gradebook_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token(7, "teacher@school.test", &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.teacher_id(), Some(7));
//! ```

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use gradebook_config::JwtConfig;
use gradebook_core::AppError;

use crate::claims::Claims;

/// Creates an access token for a teacher.
///
/// # Errors
///
/// Returns an internal error if token encoding fails.
pub fn create_access_token(
    teacher_id: i64,
    email: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry as usize;

    let claims = Claims {
        sub: teacher_id.to_string(),
        email: email.to_string(),
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to create token: {e}")))
}

/// Verifies an access token and returns the embedded claims.
///
/// # Errors
///
/// Returns an unauthorized error if the signature is invalid, the token has
/// expired, or the token is malformed.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}
