//! # Gradebook Core
//!
//! Core types shared by every crate of the Gradebook API.
//!
//! - [`errors`]: Application error type with HTTP response conversion
//!
//! # Example
//!
//! ```ignore
//! use gradebook_core::AppError;
//!
//! let error = AppError::not_found(anyhow::anyhow!("Subject not found"));
//! ```

pub mod errors;

pub use errors::AppError;
