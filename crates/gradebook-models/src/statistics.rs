//! Aggregate statistics over a set of grade records.
//!
//! Statistics are recomputed from the records every time they are returned
//! and never stored.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::component::{Component, round2};
use crate::grade_record::GradeRecord;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct GradeStatistics {
    /// Denominator of the rates: roster size, or imported rows for an import.
    pub total_students: usize,
    /// Records with at least one component score.
    pub students_with_notes: usize,
    pub average_cc: Option<f64>,
    pub average_tp: Option<f64>,
    pub average_dv: Option<f64>,
    pub average_final: Option<f64>,
    /// Percentage of `total_students` with a passing final grade.
    pub pass_rate: f64,
    /// Percentage of `total_students` with every required component.
    pub completion_rate: f64,
}

impl GradeStatistics {
    pub fn compute<'a, I>(total_students: usize, records: I, has_tp: bool) -> Self
    where
        I: IntoIterator<Item = &'a GradeRecord>,
    {
        let records: Vec<&GradeRecord> = records.into_iter().collect();

        let average = |values: Vec<f64>| {
            if values.is_empty() {
                None
            } else {
                Some(round2(values.iter().sum::<f64>() / values.len() as f64))
            }
        };
        let component_average = |component: Component| {
            average(
                records
                    .iter()
                    .filter_map(|r| r.scores().get(component))
                    .collect(),
            )
        };

        let passed = records.iter().filter(|r| r.is_passed()).count();
        let complete = records.iter().filter(|r| r.has_all_required(has_tp)).count();

        Self {
            total_students,
            students_with_notes: records.iter().filter(|r| !r.scores().is_empty()).count(),
            average_cc: component_average(Component::Cc),
            average_tp: component_average(Component::Tp),
            average_dv: component_average(Component::Dv),
            average_final: average(records.iter().filter_map(|r| r.note_finale()).collect()),
            pass_rate: rate(passed, total_students),
            completion_rate: rate(complete, total_students),
        }
    }
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(count as f64 / total as f64 * 100.0)
    }
}

/// Per (subject, class) summary computed by the store.
#[derive(Debug, Clone, PartialEq, Default, FromRow, Serialize, ToSchema)]
pub struct SubjectClassStatistics {
    pub total_students: i64,
    pub students_with_notes: i64,
    pub average_grade: Option<f64>,
    pub pass_rate: f64,
    pub completion_rate: f64,
}
