//! # Gradebook Models
//!
//! Grade domain types and DTOs for the Gradebook API.
//!
//! # Modules
//!
//! - [`grade_config`]: Per-subject CC/TP/DV weighting and final-grade arithmetic
//! - [`grade_record`]: A student's component scores for one subject
//! - [`patch`]: Partial updates distinguishing "unchanged" from "cleared"
//! - [`statistics`]: Pass, completion and average statistics
//! - [`roster`]: Students, subjects and classes
//! - [`notes`]: Request/response DTOs for grade management
//! - [`import`]: Spreadsheet import and template types
//!
//! # Example
//!
//! ```ignore
//! use gradebook_models::{ComponentScores, GradeConfig, GradeRecord};
//! use gradebook_models::ids::{StudentId, SubjectId, TeacherId};
//!
//! let config = GradeConfig::create(SubjectId(1), 40.0, 0.0, 60.0)?;
//! let record = GradeRecord::create(
//!     StudentId(7),
//!     SubjectId(1),
//!     TeacherId(3),
//!     ComponentScores::new(Some(14.0), None, Some(16.0)),
//! )?
//! .with_final_grade(Some(&config));
//!
//! assert_eq!(record.note_finale(), Some(15.2));
//! ```

pub mod component;
pub mod errors;
pub mod grade_config;
pub mod grade_record;
pub mod ids;
pub mod import;
pub mod notes;
pub mod patch;
pub mod roster;
pub mod statistics;

pub use component::{Component, DominantComponent};
pub use errors::ValidationError;
pub use grade_config::GradeConfig;
pub use grade_record::{ComponentScores, GradeLetter, GradeRecord};
pub use patch::{ComponentPatch, Patch};
pub use statistics::{GradeStatistics, SubjectClassStatistics};

pub use roster::{SchoolClass, Student, Subject, TeacherAssignment};

pub use notes::{
    BatchGradeItem, BatchUpdateGradesRequest, BatchUpdateResult, GradeConfigView, GradeView,
    MessageResponse, SaveGradeConfigRequest, StudentGradeView, StudentNotesQuery,
    StudentNotesResponse, SubjectWithConfig, TeacherSubjectView, UpdateGradeRequest,
};

pub use import::{
    ImportProgress, ImportReport, ImportRequest, ImportStage, ImportedGrade, ParsedSpreadsheet,
    ProcessedRow, RowStatus, SpreadsheetRow, Template, TemplateRequest, TemplateStudentRow,
};
