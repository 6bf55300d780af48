//! Shared utilities.
//!
//! - [`tracing`]: Span macros, audit events and span outcome recording

pub mod tracing;
