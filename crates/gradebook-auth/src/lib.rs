//! # Gradebook Auth
//!
//! Teacher authentication for the Gradebook API.
//!
//! - [`claims`]: Access token claims
//! - [`jwt`]: Token creation and verification
//!
//! Token issuance lives outside this service; the API only verifies bearer
//! tokens signed with the shared `JWT_SECRET` and reads the teacher id from
//! the `sub` claim.

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::{create_access_token, verify_token};
