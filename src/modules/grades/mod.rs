//! Grade management: single and batch updates, spreadsheet imports, class
//! overviews and import templates.
//!
//! The services in [`service`], [`reconcile`] and [`template`] are written
//! against the [`store::GradeStore`] and
//! [`SpreadsheetReader`](crate::modules::spreadsheet::SpreadsheetReader)
//! traits; [`postgres::PgGradeStore`] is the production store.

pub mod controller;
pub mod postgres;
pub mod reconcile;
pub mod router;
pub mod service;
pub mod store;
pub mod template;

pub use postgres::PgGradeStore;
pub use reconcile::ProgressCallback;
pub use service::{GradeService, validation_error};
pub use store::{GradeStore, StoreError};
