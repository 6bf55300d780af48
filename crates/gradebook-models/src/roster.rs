//! Students, subjects, classes and teacher assignments as read from the store.

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::ids::{ClassId, StudentId, SubjectId};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub student_number: String,
    pub class_id: ClassId,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub description: Option<String>,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct SchoolClass {
    pub id: ClassId,
    pub name: String,
}

/// A (subject, class) pair a teacher is assigned to.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TeacherAssignment {
    pub subject_id: SubjectId,
    pub class_id: ClassId,
    pub subject_name: String,
    pub class_name: String,
    pub student_count: i64,
}
