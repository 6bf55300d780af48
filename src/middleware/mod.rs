//! Request extractors for cross-cutting concerns.
//!
//! - [`auth`]: Bearer token authentication of teachers
//!
//! # Authentication Flow
//!
//! 1. Client sends request with `Authorization: Bearer <token>` header
//! 2. `AuthTeacher` verifies the JWT and checks the `sub` claim is a teacher id
//! 3. Handler executes with the teacher's claims
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::AuthTeacher;
//!
//! async fn my_subjects(teacher: AuthTeacher) -> Result<impl IntoResponse, AppError> {
//!     let teacher_id = teacher.teacher_id()?;
//!     // ...
//! }
//! ```

pub mod auth;
