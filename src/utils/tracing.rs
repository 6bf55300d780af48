//! Span and event helpers shared by the grade services.
//!
//! Spans carry an `outcome` field that is filled in once the operation
//! finishes, so the JSON log files can be filtered on failed writes and
//! rejected imports without parsing messages.

use tracing::Span;

/// Create a span for a database statement.
///
/// # Example
/// ```ignore
/// let span = db_operation_span!("UPDATE", "grades", student_id = %id);
/// async {
///     // database operation
/// }.instrument(span).await;
/// ```
#[macro_export]
macro_rules! db_operation_span {
    ($operation:expr, $table:expr) => {
        tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = $operation,
            db.table = $table,
            outcome = tracing::field::Empty,
            error.message = tracing::field::Empty
        )
    };
    ($operation:expr, $table:expr, $($field:tt)*) => {
        tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = $operation,
            db.table = $table,
            outcome = tracing::field::Empty,
            error.message = tracing::field::Empty,
            $($field)*
        )
    };
}

/// Create a span for a grading operation (batch write, import, ...).
///
/// # Example
/// ```ignore
/// let span = business_span!("grades.import", subject_id = %subject_id);
/// ```
#[macro_export]
macro_rules! business_span {
    ($operation:expr) => {
        tracing::info_span!(
            $operation,
            outcome = tracing::field::Empty,
            error.message = tracing::field::Empty
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info_span!(
            $operation,
            outcome = tracing::field::Empty,
            error.message = tracing::field::Empty,
            $($field)*
        )
    };
}

/// Log an audit event at INFO level.
///
/// Emitted for every mutation of stored grades or weightings.
#[macro_export]
macro_rules! audit_event {
    ($action:expr, $resource:expr, $($field:tt)*) => {
        tracing::info!(
            audit.action = $action,
            audit.resource = $resource,
            $($field)*
        )
    };
}

pub fn record_success() {
    Span::current().record("outcome", "ok");
}

pub fn record_error(message: &str) {
    let span = Span::current();
    span.record("outcome", "error");
    span.record("error.message", message);
}

/// Log an error with context and hand the result back untouched.
pub trait ErrorExt {
    fn log_error(self, context: &str) -> Self;
}

impl<T, E: std::fmt::Display> ErrorExt for Result<T, E> {
    fn log_error(self, context: &str) -> Self {
        if let Err(ref e) = self {
            tracing::error!(error = %e, context = context, "Operation failed");
        }
        self
    }
}
