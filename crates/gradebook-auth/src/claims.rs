//! JWT claim structures for teacher access tokens.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// JWT claims for access tokens.
///
/// # Fields
///
/// - `sub`: Teacher id (subject), a positive integer rendered as a string
/// - `email`: Teacher's email address
/// - `exp`: Token expiration timestamp
/// - `iat`: Token issued-at timestamp
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// Teacher ID (subject claim)
    pub sub: String,
    pub email: String,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    /// Parses the subject as a teacher id. Returns `None` for non-numeric or
    /// non-positive subjects.
    pub fn teacher_id(&self) -> Option<i64> {
        self.sub.parse::<i64>().ok().filter(|id| *id > 0)
    }
}
